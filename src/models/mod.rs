// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model weights management

pub mod provisioning;

pub use provisioning::{
    ensure_weights, ProvisionError, ProvisionResult, ProvisionStatus, WeightsSource,
};
