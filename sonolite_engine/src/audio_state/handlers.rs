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

use anyhow::Error;
use std::panic::AssertUnwindSafe;

/// Wrapper for handlers and the tick body: converts panics into errors so one
/// faulty closure cannot take down event dispatch or the host's scheduler
/// thread.
#[inline]
pub(crate) fn run_handler_impl<T, F>(closure: F, name: &str) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    // todo clean up AssertUnwindSafe if possible
    match std::panic::catch_unwind(AssertUnwindSafe(closure)) {
        Ok(x) => x,
        Err(_e) => Err(Error::msg(format!("Handler {} panicked", name))),
    }
}
