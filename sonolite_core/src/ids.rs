// Copyright 2023 drey7925
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Debug, Display};

use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);
        impl $name {
            pub fn new_random() -> $name {
                $name(Uuid::new_v4())
            }
            pub const fn from_uuid(uuid: Uuid) -> $name {
                $name(uuid)
            }
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }
        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_fmt(format_args!(
                    concat!(stringify!($name), "({})"),
                    self.0.as_simple()
                ))
            }
        }
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                Display::fmt(&self.0.as_simple(), f)
            }
        }
    };
}

uuid_id!(
    /// A player connected to the host server. Opaque to the engine; the host
    /// resolves it to an actual connection/entity.
    PlayerId
);
uuid_id!(
    /// One of the host's loaded worlds/dimensions.
    WorldId
);
uuid_id!(
    /// A live sound instance. Invalidated when the instance is returned to the
    /// pool; lookups with a dead id return an absent value.
    SoundId
);
uuid_id!(
    /// A sound zone. Zones are long-lived and never pooled.
    ZoneId
);
uuid_id!(
    /// A fired audio event. Mostly useful for correlating log lines.
    EventId
);
