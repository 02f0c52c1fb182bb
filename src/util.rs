use rand::Rng;

fn random_from<R: Rng + ?Sized>(rng: &mut R, charset: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        let idx = rng.gen_range(0..charset.len());
        out.push(char::from(charset[idx]));
    }
    out
}

pub fn random_digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    random_from(rng, b"0123456789", len)
}

pub fn random_upper_letters<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    random_from(rng, b"ABCDEFGHIJKLMNOPQRSTUVWXYZ", len)
}

pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}
