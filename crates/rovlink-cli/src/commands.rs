//! Operator console commands.
//!
//! ```text
//!   l | toggle        – switch between local and remote control
//!   move <x> <y>      – planar stick, each axis in [-1, 1]
//!   vertical <v>      – up/down thrust in [-1, 1]
//!   rotate <r>        – yaw input in [-1, 1]
//!   stop              – release all inputs
//!   pose              – print the current pose
//!   help              – list commands
//!   quit | exit       – shut down
//! ```

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Toggle,
    Move { x: f32, y: f32 },
    Vertical(f32),
    Rotate(f32),
    Stop,
    Pose,
    Help,
    Quit,
}

/// Parse one console line.  Axis values are clamped to `[-1, 1]`.
pub fn parse(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let cmd = match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("l" | "toggle", []) => Command::Toggle,
        ("move", [x, y]) => Command::Move {
            x: axis(x)?,
            y: axis(y)?,
        },
        ("vertical", [v]) => Command::Vertical(axis(v)?),
        ("rotate", [r]) => Command::Rotate(axis(r)?),
        ("stop", []) => Command::Stop,
        ("pose", []) => Command::Pose,
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        (other, _) => return Err(format!("unknown command or wrong arguments: '{other}'")),
    };
    Ok(cmd)
}

fn axis(raw: &str) -> Result<f32, String> {
    let v: f32 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !v.is_finite() {
        return Err(format!("'{raw}' is not finite"));
    }
    Ok(v.clamp(-1.0, 1.0))
}
