pub mod secret_hash;

pub use secret_hash::secret_hash;
