//! The `utils` module collects the pieces shared by every other module of
//! `txack`: the error types and the logging bootstrap.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests {
    use super::logging;

    #[test]
    fn logging_init_accepts_levels() {
        logging::init("info");
        logging::init("debug");
        logging::init("not-a-level");
    }
}
