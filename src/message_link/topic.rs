use strum_macros::{Display, EnumIter};

/// Every topic the security module publishes on or subscribes to.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy, Hash, EnumIter)]
pub enum Topic {
    Ping,
    FlightStatus,
    ForbiddenZones,
    FlightMission,
    ArmResponse,
    MissionResponse,
    ArmRequest,
    MissionRequest,
    Events,
}

impl Topic {
    /// The topic as written in the topic table, without the board suffix.
    pub fn name(self) -> &'static str {
        match self {
            Topic::Ping => "ping/",
            Topic::FlightStatus => "api/flight_status/",
            Topic::ForbiddenZones => "api/forbidden_zones",
            Topic::FlightMission => "api/fmission_kos/",
            Topic::ArmResponse => "api/arm/response/",
            Topic::MissionResponse => "api/nmission/response/",
            Topic::ArmRequest => "api/arm/request",
            Topic::MissionRequest => "api/nmission/request",
            Topic::Events => "api/events",
        }
    }

    /// Whether the security module reads this topic (as opposed to publishing on it).
    pub fn is_subscription(self) -> bool {
        !matches!(self, Topic::ArmRequest | Topic::MissionRequest | Topic::Events)
    }

    /// Forbidden zones are broadcast to every board and carry no suffix.
    pub fn is_board_scoped(self) -> bool { !matches!(self, Topic::ForbiddenZones) }

    /// The concrete broker address of this topic for the given board.
    ///
    /// Subscription topics already end in `/`, published topics get a `/`
    /// inserted before the board identity.
    pub fn address(self, board_id: &str) -> String {
        let name = self.name();
        if !self.is_board_scoped() {
            name.to_string()
        } else if name.ends_with('/') {
            format!("{name}{board_id}")
        } else {
            format!("{name}/{board_id}")
        }
    }
}
