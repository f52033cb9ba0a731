//! The function table handed to the host runtime.
//!
//! Arguments arrive as JSON values. Every export checks the argument count
//! first, then the argument types, then makes its single backend call.
//! Extra arguments are ignored.

use hid_input::{Hid, HidError, Key, MouseButton};
use serde_json::{json, Value};

/// Why an exported call was rejected.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Fewer arguments than the export requires.
    #[error("Wrong number of arguments")]
    ArgumentCount,

    /// An argument has the wrong type or an out-of-range value.
    #[error("Wrong arguments")]
    ArgumentType,

    /// No export with this name.
    #[error("{0} is not exported")]
    NotExported(String),

    /// The backend failed to perform the operation.
    #[error(transparent)]
    Backend(#[from] HidError),
}

impl CallError {
    /// Exception class the host runtime should raise.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ArgumentCount | Self::ArgumentType => "TypeError",
            Self::NotExported(_) => "ReferenceError",
            Self::Backend(_) => "Error",
        }
    }
}

type Handler = fn(&mut Hid, &[Value]) -> Result<Value, CallError>;

/// One exported function.
pub struct Export {
    pub name: &'static str,
    /// Minimum number of arguments.
    pub arity: usize,
    handler: Handler,
}

/// All exported functions.
pub const EXPORTS: &[Export] = &[
    Export {
        name: "mouseMoveDelta",
        arity: 2,
        handler: mouse_move_delta,
    },
    Export {
        name: "mouseMoveABS",
        arity: 2,
        handler: mouse_move_abs,
    },
    Export {
        name: "mouseGetCurrentPosition",
        arity: 0,
        handler: mouse_get_current_position,
    },
    Export {
        name: "mouseShow",
        arity: 0,
        handler: mouse_show,
    },
    Export {
        name: "mouseButtonDown",
        arity: 1,
        handler: mouse_button_down,
    },
    Export {
        name: "mouseButtonUp",
        arity: 1,
        handler: mouse_button_up,
    },
    Export {
        name: "keyDown",
        arity: 1,
        handler: key_down,
    },
    Export {
        name: "keyUp",
        arity: 1,
        handler: key_up,
    },
];

/// Invoke an export by name.
///
/// # Errors
///
/// Returns a [`CallError`] describing the exception the host should raise.
pub fn call(hid: &mut Hid, name: &str, args: &[Value]) -> Result<Value, CallError> {
    let export = EXPORTS
        .iter()
        .find(|export| export.name == name)
        .ok_or_else(|| CallError::NotExported(name.to_string()))?;

    if args.len() < export.arity {
        return Err(CallError::ArgumentCount);
    }

    (export.handler)(hid, args)
}

fn number(value: &Value) -> Result<f64, CallError> {
    value
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or(CallError::ArgumentType)
}

fn button(value: &Value) -> Result<MouseButton, CallError> {
    match value {
        Value::String(name) => name.parse().map_err(|_| CallError::ArgumentType),
        Value::Number(n) => n
            .as_u64()
            .and_then(MouseButton::from_index)
            .ok_or(CallError::ArgumentType),
        _ => Err(CallError::ArgumentType),
    }
}

fn key(value: &Value) -> Result<Key, CallError> {
    match value {
        Value::String(name) => name.parse().map_err(|_| CallError::ArgumentType),
        Value::Number(n) => n
            .as_u64()
            .and_then(|code| u32::try_from(code).ok())
            .map(Key::Raw)
            .ok_or(CallError::ArgumentType),
        _ => Err(CallError::ArgumentType),
    }
}

fn mouse_move_abs(hid: &mut Hid, args: &[Value]) -> Result<Value, CallError> {
    let (x, y) = (number(&args[0])?, number(&args[1])?);
    hid.move_abs(x, y)?;
    Ok(Value::Null)
}

fn mouse_move_delta(hid: &mut Hid, args: &[Value]) -> Result<Value, CallError> {
    let (dx, dy) = (number(&args[0])?, number(&args[1])?);
    hid.move_delta(dx, dy)?;
    Ok(Value::Null)
}

fn mouse_get_current_position(hid: &mut Hid, _args: &[Value]) -> Result<Value, CallError> {
    let point = hid.position()?;
    Ok(json!({ "x": point.x, "y": point.y }))
}

fn mouse_show(hid: &mut Hid, _args: &[Value]) -> Result<Value, CallError> {
    hid.show_cursor()?;
    Ok(Value::Null)
}

fn mouse_button_down(hid: &mut Hid, args: &[Value]) -> Result<Value, CallError> {
    hid.button_down(button(&args[0])?)?;
    Ok(Value::Null)
}

fn mouse_button_up(hid: &mut Hid, args: &[Value]) -> Result<Value, CallError> {
    hid.button_up(button(&args[0])?)?;
    Ok(Value::Null)
}

fn key_down(hid: &mut Hid, args: &[Value]) -> Result<Value, CallError> {
    hid.key_down(key(&args[0])?)?;
    Ok(Value::Null)
}

fn key_up(hid: &mut Hid, args: &[Value]) -> Result<Value, CallError> {
    hid.key_up(key(&args[0])?)?;
    Ok(Value::Null)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use hid_input::{Bounds, HidBackend, Point};

    use super::*;

    /// Backend that records every call as a string.
    pub(crate) struct RecordingBackend {
        pub position: Point,
        pub log: Arc<Mutex<Vec<String>>>,
    }

    impl HidBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn screen_bounds(&self) -> Option<Bounds> {
            Some(Bounds::new(0.0, 0.0, 1024.0, 768.0))
        }

        fn cursor_position(&mut self) -> Result<Point, HidError> {
            Ok(self.position)
        }

        fn warp_pointer(&mut self, to: Point) -> Result<(), HidError> {
            self.position = to;
            self.log.lock().unwrap().push(format!("warp {} {}", to.x, to.y));
            Ok(())
        }

        fn button(&mut self, button: MouseButton, pressed: bool) -> Result<(), HidError> {
            self.log.lock().unwrap().push(format!("button {button} {pressed}"));
            Ok(())
        }

        fn key(&mut self, key: Key, pressed: bool) -> Result<(), HidError> {
            self.log.lock().unwrap().push(format!("key {key} {pressed}"));
            Ok(())
        }

        fn show_cursor(&mut self) -> Result<(), HidError> {
            Err(HidError::Unsupported("cursor visibility"))
        }
    }

    pub(crate) fn recording_hid() -> (Hid, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let backend = RecordingBackend {
            position: Point::new(10.0, 10.0),
            log: Arc::clone(&log),
        };
        (Hid::new(Box::new(backend), true), log)
    }

    #[test]
    fn too_few_arguments_is_type_error() {
        let (mut hid, log) = recording_hid();
        let err = call(&mut hid, "mouseMoveABS", &[json!(1)]).unwrap_err();
        assert!(matches!(err, CallError::ArgumentCount));
        assert_eq!(err.kind(), "TypeError");
        assert_eq!(err.to_string(), "Wrong number of arguments");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn non_number_coordinates_are_rejected() {
        let (mut hid, log) = recording_hid();
        let err = call(&mut hid, "mouseMoveDelta", &[json!(1), json!("2")]).unwrap_err();
        assert!(matches!(err, CallError::ArgumentType));
        assert_eq!(err.to_string(), "Wrong arguments");
        let err = call(&mut hid, "mouseMoveABS", &[Value::Null, json!(2)]).unwrap_err();
        assert!(matches!(err, CallError::ArgumentType));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn move_abs_clamps_and_returns_undefined() {
        let (mut hid, log) = recording_hid();
        let result = call(&mut hid, "mouseMoveABS", &[json!(2000), json!(-3.5)]).unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(*log.lock().unwrap(), vec!["warp 1023 0".to_string()]);
    }

    #[test]
    fn extra_arguments_are_ignored() {
        let (mut hid, log) = recording_hid();
        call(&mut hid, "mouseMoveDelta", &[json!(5), json!(-5), json!("extra")]).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["warp 15 5".to_string()]);
    }

    #[test]
    fn position_is_an_object() {
        let (mut hid, _) = recording_hid();
        let result = call(&mut hid, "mouseGetCurrentPosition", &[]).unwrap();
        assert_eq!(result, json!({ "x": 10.0, "y": 10.0 }));
    }

    #[test]
    fn buttons_by_name_or_index() {
        let (mut hid, log) = recording_hid();
        call(&mut hid, "mouseButtonDown", &[json!("left")]).unwrap();
        call(&mut hid, "mouseButtonUp", &[json!(0)]).unwrap();
        assert!(matches!(
            call(&mut hid, "mouseButtonDown", &[json!(9)]),
            Err(CallError::ArgumentType)
        ));
        assert!(matches!(
            call(&mut hid, "mouseButtonDown", &[json!(true)]),
            Err(CallError::ArgumentType)
        ));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["button left true".to_string(), "button left false".to_string()]
        );
    }

    #[test]
    fn keys_by_name_or_raw_code() {
        let (mut hid, log) = recording_hid();
        call(&mut hid, "keyDown", &[json!("Return")]).unwrap();
        call(&mut hid, "keyUp", &[json!(28)]).unwrap();
        assert!(matches!(
            call(&mut hid, "keyDown", &[json!(-1)]),
            Err(CallError::ArgumentType)
        ));
        assert!(matches!(
            call(&mut hid, "keyDown", &[json!("hyper")]),
            Err(CallError::ArgumentType)
        ));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["key enter true".to_string(), "key raw:28 false".to_string()]
        );
    }

    #[test]
    fn backend_failure_is_plain_error() {
        let (mut hid, _) = recording_hid();
        let err = call(&mut hid, "mouseShow", &[]).unwrap_err();
        assert_eq!(err.kind(), "Error");
        assert!(err.to_string().contains("cursor visibility"));
    }

    #[test]
    fn unknown_export_is_reference_error() {
        let (mut hid, _) = recording_hid();
        let err = call(&mut hid, "mouseClick", &[]).unwrap_err();
        assert_eq!(err.kind(), "ReferenceError");
        assert_eq!(err.to_string(), "mouseClick is not exported");
    }

    #[test]
    fn export_names_are_unique() {
        let mut names: Vec<&str> = EXPORTS.iter().map(|e| e.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EXPORTS.len());
    }
}
