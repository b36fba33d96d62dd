mod sweep;

pub use sweep::SweepProfile;
