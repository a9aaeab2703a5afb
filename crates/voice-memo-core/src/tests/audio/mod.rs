#[cfg(feature = "hardware")]
mod capture;
