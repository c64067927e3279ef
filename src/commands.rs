//! Fire-and-forget camera commands.
//!
//! The camera speaks two dialects: the relay (OPC) firmware uses different
//! endpoints for mode switching and shutter control than the standalone one.

/// A command that changes camera state and returns nothing of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraCommand {
    PowerOn,
    PowerOff,
    /// Switch to `rec`, `play`, `shutter` or `standalone`.
    SwitchMode(String),
    /// Route traffic over WiFi instead of Bluetooth.
    UseWifi,
    ShutterPress,
    ShutterRelease,
    /// Half-press the shutter to focus.
    FocusPress,
    FocusRelease,
}

impl CameraCommand {
    /// Endpoint and query parameters for this command in the given dialect.
    #[must_use]
    pub fn request(&self, opc: bool) -> (&'static str, Vec<String>) {
        match self {
            Self::PowerOn => ("exec_pwon", vec![]),
            Self::PowerOff => ("exec_pwoff", vec![]),
            Self::SwitchMode(mode) if opc => {
                let mode = if mode == "shutter" { "rec" } else { mode.as_str() };
                ("switch_cameramode", vec![format!("mode={mode}")])
            }
            Self::SwitchMode(mode) => ("switch_cammode", vec![format!("mode={mode}")]),
            Self::UseWifi => ("switch_commpath", vec!["path=wifi".to_string()]),
            Self::ShutterPress if opc => ("exec_takemotion", vec!["com=newstarttake".to_string()]),
            Self::ShutterPress => ("exec_shutter", vec!["com=1st2ndpush".to_string()]),
            Self::ShutterRelease if opc => ("exec_takemotion", vec!["com=newstoptake".to_string()]),
            Self::ShutterRelease => ("exec_shutter", vec!["com=2nd1strelease".to_string()]),
            Self::FocusPress => ("exec_shutter", vec!["com=1stpush".to_string()]),
            Self::FocusRelease => ("exec_shutter", vec!["com=1strelease".to_string()]),
        }
    }
}

impl crate::protocol::CameraClient {
    /// Sends a command in the dialect matching `opc`, logging failures.
    pub async fn send(&self, command: &CameraCommand, opc: bool) {
        let (endpoint, params) = command.request(opc);
        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        self.execute(endpoint, &params).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(command: &CameraCommand, opc: bool) -> String {
        let (endpoint, params) = command.request(opc);
        if params.is_empty() {
            endpoint.to_string()
        } else {
            format!("{endpoint}?{}", params.join("&"))
        }
    }

    #[test]
    fn power() {
        assert_eq!(target(&CameraCommand::PowerOn, false), "exec_pwon");
        assert_eq!(target(&CameraCommand::PowerOff, true), "exec_pwoff");
    }

    #[test]
    fn mode_switch_depends_on_dialect() {
        let rec = CameraCommand::SwitchMode("rec".to_string());
        assert_eq!(target(&rec, false), "switch_cammode?mode=rec");
        assert_eq!(target(&rec, true), "switch_cameramode?mode=rec");

        let shutter = CameraCommand::SwitchMode("shutter".to_string());
        assert_eq!(target(&shutter, false), "switch_cammode?mode=shutter");
        assert_eq!(target(&shutter, true), "switch_cameramode?mode=rec");
    }

    #[test]
    fn shutter_depends_on_dialect() {
        assert_eq!(target(&CameraCommand::ShutterPress, false), "exec_shutter?com=1st2ndpush");
        assert_eq!(target(&CameraCommand::ShutterPress, true), "exec_takemotion?com=newstarttake");
        assert_eq!(target(&CameraCommand::ShutterRelease, false), "exec_shutter?com=2nd1strelease");
        assert_eq!(target(&CameraCommand::ShutterRelease, true), "exec_takemotion?com=newstoptake");
    }

    #[test]
    fn focus_and_wifi() {
        assert_eq!(target(&CameraCommand::FocusPress, true), "exec_shutter?com=1stpush");
        assert_eq!(target(&CameraCommand::FocusRelease, false), "exec_shutter?com=1strelease");
        assert_eq!(target(&CameraCommand::UseWifi, true), "switch_commpath?path=wifi");
    }
}
