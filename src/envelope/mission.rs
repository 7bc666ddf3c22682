use super::EnvelopeError;
use super::geo::{GeoPoint3, parse_numbers};
use fixed::types::I32F32;
use std::fmt::{Display, Formatter};

/// One step of a flight mission as announced by the ATM server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionCommand {
    /// `H<lat>_<lon>_<alt>`
    Home(GeoPoint3),
    /// `T<alt>`
    Takeoff(I32F32),
    /// `W<lat>_<lon>_<alt>`
    Waypoint(GeoPoint3),
    /// `D<seconds>`
    Delay(I32F32),
    /// `S<number>_<pwm>`
    SetServo { number: I32F32, pwm: I32F32 },
    /// `L<lat>_<lon>_<alt>`
    Land(GeoPoint3),
    /// `I<lat>_<lon>_<alt>`
    Inspect(GeoPoint3),
}

impl MissionCommand {
    fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let mut chars = raw.chars();
        let letter = chars.next().ok_or(EnvelopeError::Malformed)?;
        let args = chars.as_str();
        match letter {
            'H' => Ok(MissionCommand::Home(GeoPoint3::parse_triple(args)?)),
            'T' => Ok(MissionCommand::Takeoff(Self::single(args)?)),
            'W' => Ok(MissionCommand::Waypoint(GeoPoint3::parse_triple(args)?)),
            'D' => Ok(MissionCommand::Delay(Self::single(args)?)),
            'S' => match parse_numbers(args)?.as_slice() {
                [number, pwm] => Ok(MissionCommand::SetServo { number: *number, pwm: *pwm }),
                _ => Err(EnvelopeError::Malformed),
            },
            'L' => Ok(MissionCommand::Land(GeoPoint3::parse_triple(args)?)),
            'I' => Ok(MissionCommand::Inspect(GeoPoint3::parse_triple(args)?)),
            _ => Err(EnvelopeError::Malformed),
        }
    }

    fn single(args: &str) -> Result<I32F32, EnvelopeError> {
        match parse_numbers(args)?.as_slice() {
            [value] => Ok(*value),
            _ => Err(EnvelopeError::Malformed),
        }
    }
}

impl Display for MissionCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionCommand::Home(p) => write!(f, "Home {p}"),
            MissionCommand::Takeoff(alt) => write!(f, "Takeoff to {alt:.2}m"),
            MissionCommand::Waypoint(p) => write!(f, "Waypoint {p}"),
            MissionCommand::Delay(secs) => write!(f, "Delay {secs}s"),
            MissionCommand::SetServo { number, pwm } => write!(f, "Servo {number} -> {pwm}"),
            MissionCommand::Land(p) => write!(f, "Land {p}"),
            MissionCommand::Inspect(p) => write!(f, "Inspect {p}"),
        }
    }
}

/// An ordered list of mission commands, replaced wholesale on every new envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MissionDocument {
    commands: Vec<MissionCommand>,
}

impl MissionDocument {
    pub fn new(commands: Vec<MissionCommand>) -> Self { Self { commands } }
    pub fn commands(&self) -> &[MissionCommand] { &self.commands }
    pub fn len(&self) -> usize { self.commands.len() }
    pub fn is_empty(&self) -> bool { self.commands.is_empty() }

    /// Parses the `&` separated body following `$FlightMission `.
    pub(super) fn parse(body: &str) -> Result<Self, EnvelopeError> {
        if body.trim().is_empty() {
            return Err(EnvelopeError::Malformed);
        }
        let commands = body
            .split('&')
            .map(MissionCommand::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { commands })
    }
}
