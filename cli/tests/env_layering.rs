// Environment variables are process-wide, so this suite lives in its own test
// binary and holds a single test.

use claims::assert_ok;
use std::io::Write;
use sweeper::config::load_config;
use tempfile::NamedTempFile;

#[test]
fn environment_overrides_file_values() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        b"filter = \"filefilter\"\n\n[cleanup]\nbatch_size = 3\nconcurrency_limit = 4\n",
    )
    .unwrap();

    // SAFETY: no other thread in this test binary reads the environment
    unsafe {
        std::env::set_var("SWEEPER__FILTER", "envfilter");
        std::env::set_var("SWEEPER__CLEANUP__BATCH_SIZE", "7");
    }

    let config = assert_ok!(load_config(Some(file.path())));

    assert_eq!(config.filter(), Some("envfilter"));
    assert_eq!(config.cleanup().batch_size(), 7);
    // Values the environment does not set still come from the file
    assert_eq!(config.cleanup().concurrency_limit(), 4);

    unsafe {
        std::env::remove_var("SWEEPER__FILTER");
        std::env::remove_var("SWEEPER__CLEANUP__BATCH_SIZE");
    }
}
