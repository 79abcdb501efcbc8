use rand::rngs::OsRng;
use rand::Rng;

pub const OTP_LENGTH: usize = 6;

/// Generate a fresh one-time code: six decimal digits drawn from the OS
/// entropy source. Stateless; verification happens downstream.
pub fn generate_otp() -> String {
    let mut rng = OsRng;
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
