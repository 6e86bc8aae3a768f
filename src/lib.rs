// Copyright 2026 The Datasmith Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod arbiter;
pub mod common;
pub mod datamodel;
pub mod diff;
pub mod history;
pub mod json;
pub mod positions;
pub mod projection;
pub mod session;
pub mod store;

#[cfg(test)]
mod json_proptest;
#[cfg(test)]
mod testutils;

pub use self::common::{Error, ErrorCode, ErrorKind, Result};
pub use self::json::{parse_document, serialize_document};
pub use self::positions::{InMemoryPositionStore, Point, PositionStore};
pub use self::session::{EngineConfig, EngineEvent, Session, SessionRegistry};
pub use self::store::ModelStore;
