//! Inbound lines: host commands, gesture callbacks and simulator controls.

use std::time::{SystemTime, UNIX_EPOCH};

use controller::{
    Command, CommandError, ErrorKind, GestureDisposition, MapController, Reply, ReplyOutcome,
};
use engine::Location;
use engine::sim::SimDriver;
use foundation::{LatLng, ScreenPoint};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Gesture(Gesture),
    Sim(SimAction),
    Command(Command),
}

/// Builds the reply for a command line that carries an `id` but fails to
/// parse. Gesture and simulator lines have nobody waiting on them.
pub fn rejection(line: &str) -> Option<Reply> {
    let value: Value = serde_json::from_str(line).ok()?;
    let object = value.as_object()?;
    if object.contains_key("gesture") || object.contains_key("sim") {
        return None;
    }
    let id = object.get("id")?.as_u64()?;
    let err = serde_json::from_value::<Command>(value).err()?;
    Some(Reply {
        id,
        outcome: ReplyOutcome::Error(CommandError::new(ErrorKind::MalformedArgument, err.to_string())),
    })
}

/// Move-gesture callbacks as a platform gesture detector would deliver them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "gesture", rename_all = "camelCase")]
pub enum Gesture {
    #[serde(rename_all = "camelCase")]
    Begin {
        x: f64,
        y: f64,
        #[serde(default = "one")]
        pointers: u32,
        #[serde(default = "yes")]
        fresh_press: bool,
    },
    Move {
        x: f64,
        y: f64,
        #[serde(default = "one")]
        pointers: u32,
    },
    End { x: f64, y: f64 },
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

impl Gesture {
    pub fn apply(&self, controller: &mut MapController) -> GestureDisposition {
        match *self {
            Self::Begin {
                x,
                y,
                pointers,
                fresh_press,
            } => controller.on_move_begin(ScreenPoint::new(x, y), pointers, fresh_press),
            Self::Move { x, y, pointers } => controller.on_move(ScreenPoint::new(x, y), pointers),
            Self::End { x, y } => controller.on_move_end(ScreenPoint::new(x, y)),
        }
    }
}

/// Input the simulated engine would otherwise get from a touch screen or a
/// location provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "sim", rename_all = "camelCase")]
pub enum SimAction {
    Tap { x: f64, y: f64 },
    LongPress { x: f64, y: f64 },
    Pan { dx: f64, dy: f64 },
    #[serde(rename_all = "camelCase")]
    Location {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        altitude: f64,
        #[serde(default)]
        speed: f64,
        #[serde(default)]
        bearing: f64,
        #[serde(default)]
        accuracy: f64,
    },
    CacheFailure { fails: bool },
}

impl SimAction {
    pub fn apply(&self, driver: &SimDriver) {
        match *self {
            Self::Tap { x, y } => driver.tap(ScreenPoint::new(x, y)),
            Self::LongPress { x, y } => driver.long_press(ScreenPoint::new(x, y)),
            Self::Pan { dx, dy } => driver.pan(dx, dy),
            Self::Location {
                latitude,
                longitude,
                altitude,
                speed,
                bearing,
                accuracy,
            } => driver.push_location(Location {
                position: LatLng::new(latitude, longitude),
                altitude,
                speed,
                bearing,
                horizontal_accuracy: accuracy,
                vertical_accuracy: None,
                timestamp_ms: now_ms(),
            }),
            Self::CacheFailure { fails } => driver.set_cache_failure(fails),
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{Gesture, Inbound, SimAction, rejection};
    use controller::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(line: &str) -> Inbound {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn commands_default_missing_arguments() {
        let Inbound::Command(cmd) = parse(r#"{"id": 7, "method": "map#waitForMap"}"#) else {
            panic!("not a command");
        };
        assert_eq!(cmd.id, 7);
        assert_eq!(cmd.method, "map#waitForMap");
        assert_eq!(cmd.arguments, serde_json::Value::Null);

        let Inbound::Command(cmd) =
            parse(r#"{"id": 8, "method": "camera#move", "arguments": {"cameraUpdate": ["zoomIn"]}}"#)
        else {
            panic!("not a command");
        };
        assert_eq!(cmd.arguments, json!({"cameraUpdate": ["zoomIn"]}));
    }

    #[test]
    fn gestures_fill_in_single_finger_defaults() {
        let Inbound::Gesture(g) = parse(r#"{"gesture": "begin", "x": 1, "y": 2}"#) else {
            panic!("not a gesture");
        };
        assert_eq!(
            g,
            Gesture::Begin {
                x: 1.0,
                y: 2.0,
                pointers: 1,
                fresh_press: true
            }
        );
        let Inbound::Gesture(g) = parse(r#"{"gesture": "move", "x": 1, "y": 2, "pointers": 2}"#)
        else {
            panic!("not a gesture");
        };
        assert_eq!(g, Gesture::Move { x: 1.0, y: 2.0, pointers: 2 });
    }

    #[test]
    fn sim_actions_parse() {
        let Inbound::Sim(action) = parse(r#"{"sim": "longPress", "x": 5, "y": 6}"#) else {
            panic!("not a sim action");
        };
        assert_eq!(action, SimAction::LongPress { x: 5.0, y: 6.0 });
        assert!(serde_json::from_str::<Inbound>(r#"{"sim": "explode"}"#).is_err());
        assert!(serde_json::from_str::<Inbound>(r#"{"method": "map#update"}"#).is_err());
    }

    #[test]
    fn unparseable_commands_with_an_id_are_rejected() {
        let line = r#"{"id": 12, "method": 5}"#;
        assert!(serde_json::from_str::<Inbound>(line).is_err());
        let reply = rejection(line).unwrap();
        assert_eq!(reply.id, 12);
        assert_eq!(reply.error_kind(), Some(ErrorKind::MalformedArgument));

        assert!(rejection(r#"{"id": 3}"#).is_some());
        assert!(rejection(r#"{"method": "map#update"}"#).is_none());
        assert!(rejection(r#"{"id": -1, "method": "map#update"}"#).is_none());
        assert!(rejection(r#"{"sim": "explode", "id": 4}"#).is_none());
        assert!(rejection("not json").is_none());
    }
}
