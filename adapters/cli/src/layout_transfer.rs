#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use maze_rooms_core::{
    door_cell, CellGrid, CellState, Direction, GridError, InnerRoomBitmask, DEFAULT_INSET,
};
use maze_rooms_system_generation::{GeneratedLevel, WallSegment};
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "rooms";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "rooms:v1";
/// Delimiter used to separate the prefix, room side and payload.
const FIELD_DELIMITER: char = ':';

/// Generated room layout in a form that fits on one line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct RoomLayoutSnapshot {
    /// Number of cells along each room edge.
    pub(crate) side: u32,
    /// Door offsets along the North, East, South and West walls.
    pub(crate) door_positions: [u32; 4],
    /// Packed interior cells.
    pub(crate) bitmask: u64,
    /// Wall runs of the layout.
    pub(crate) segments: Vec<WallSegment>,
}

impl RoomLayoutSnapshot {
    /// Captures a generated level.
    pub(crate) fn from_level(level: &GeneratedLevel) -> Result<Self, LayoutTransferError> {
        let side = u32::try_from(level.grid().side())
            .map_err(|_| LayoutTransferError::InvalidSide(level.grid().side().to_string()))?;
        Ok(Self {
            side,
            door_positions: level.door_positions(),
            bitmask: level.bitmask().get(),
            segments: level.segments().to_vec(),
        })
    }

    /// Encodes the snapshot into a single-line transfer string.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableSnapshot {
            door_positions: self.door_positions,
            bitmask: self.bitmask,
            segments: self.segments.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{SNAPSHOT_HEADER}:{}:{encoded}", self.side))
    }

    /// Decodes a snapshot from its transfer string.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let side = parts.next().ok_or(LayoutTransferError::MissingSide)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let side = parse_side(side)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        Ok(Self {
            side,
            door_positions: decoded.door_positions,
            bitmask: decoded.bitmask,
            segments: decoded.segments,
        })
    }

    /// Rebuilds the full cell grid: closed border, doors and packed interior.
    pub(crate) fn to_grid(&self) -> Result<CellGrid, LayoutTransferError> {
        let side = usize::try_from(self.side)
            .map_err(|_| LayoutTransferError::InvalidSide(self.side.to_string()))?;
        let side_i32 = i32::try_from(self.side)
            .map_err(|_| LayoutTransferError::InvalidSide(self.side.to_string()))?;
        let mut grid = CellGrid::filled(side, CellState::Closed);
        InnerRoomBitmask::new(self.bitmask).write_into(&mut grid, DEFAULT_INSET)?;
        for direction in Direction::ALL {
            let offset = self.door_positions[usize::from(direction.index())];
            let offset = i32::try_from(offset)
                .map_err(|_| LayoutTransferError::InvalidSide(offset.to_string()))?;
            grid.set(door_cell(direction, offset, side_i32), CellState::Door)?;
        }
        Ok(grid)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableSnapshot {
    door_positions: [u32; 4],
    bitmask: u64,
    segments: Vec<WallSegment>,
}

/// Errors that can occur while handling layout transfer strings.
#[derive(Debug)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    MissingVersion,
    /// The encoded snapshot did not include the room side.
    MissingSide,
    /// The encoded snapshot did not include the payload segment.
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The room side could not be parsed or does not fit a room.
    InvalidSide(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    InvalidPayload(serde_json::Error),
    /// The decoded layout does not fit its room.
    InvalidLayout(GridError),
}

impl fmt::Display for LayoutTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "layout string was empty"),
            Self::MissingPrefix => write!(f, "layout string is missing the prefix"),
            Self::MissingVersion => write!(f, "layout string is missing the version"),
            Self::MissingSide => write!(f, "layout string is missing the room side"),
            Self::MissingPayload => write!(f, "layout string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "layout prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "layout version '{version}' is not supported")
            }
            Self::InvalidSide(side) => write!(f, "could not use room side '{side}'"),
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode layout payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse layout payload: {error}")
            }
            Self::InvalidLayout(error) => write!(f, "layout does not fit its room: {error}"),
        }
    }
}

impl Error for LayoutTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            Self::InvalidLayout(error) => Some(error),
            _ => None,
        }
    }
}

impl From<GridError> for LayoutTransferError {
    fn from(error: GridError) -> Self {
        Self::InvalidLayout(error)
    }
}

fn parse_side(side: &str) -> Result<u32, LayoutTransferError> {
    let parsed = side
        .trim()
        .parse::<u32>()
        .map_err(|_| LayoutTransferError::InvalidSide(side.to_owned()))?;
    if parsed < 3 {
        return Err(LayoutTransferError::InvalidSide(side.to_owned()));
    }
    Ok(parsed)
}
