#[derive(Debug, Clone, Copy)]
pub struct Seconds(pub i64);

impl Seconds {
    pub const fn one_hour() -> Self {
        Self(3600)
    }
}
