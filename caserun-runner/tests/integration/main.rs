// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests that run the fixture suite against `/bin/sh`.

#[cfg(unix)]
mod basic;
#[cfg(unix)]
mod fixtures;
