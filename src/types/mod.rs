// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod id;
pub mod enums;
pub mod date;

pub use date::{calendar_day, parse_business_date};
pub use enums::{EquipmentType, EventKind, Role};
pub use id::{ActorId, AssetId, EventId};
