// Licensed under the Apache-2.0 license

//! Collaborators used to exercise the resiliency engine off target:
//! in-memory flash, a fake sideband bus and platform, a fake RSA
//! environment, and builders for containers and update status regions.

pub mod corruptor;
pub mod crypto;
pub mod flash;
pub mod image;
pub mod locator;
pub mod platform;
pub mod sideband;
pub mod status;

pub use corruptor::{ComponentCorruptor, Corruption};
pub use crypto::{FakeCryptoEnv, TestSigningKey};
pub use flash::InMemoryFlash;
pub use image::{refresh_header_crc, BuiltImage, IasImageBuilder};
pub use locator::FixedRegionLocator;
pub use platform::{run_to_terminal, FakePlatform, Terminal};
pub use sideband::FakeSidebandBus;
pub use status::UpdateStatusBuilder;
