use common_http_errors::test_helpers::{distinct_gauge, overflow_count, simulate_error_code};

#[test]
fn distinct_and_overflow_tracking() {
    for i in 0..5 {
        simulate_error_code(&format!("code_{}", i));
    }
    assert!(distinct_gauge() >= 5, "expected at least 5 distinct codes");
    let before_overflow = overflow_count();

    for i in 5..50 {
        simulate_error_code(&format!("code_{}", i));
    }
    assert!(distinct_gauge() as usize <= 40, "distinct gauge should be capped at guard (<=40), got {}", distinct_gauge());
    assert!(overflow_count() > before_overflow, "expected overflow counter to increment");

    // Codes already admitted keep their own label.
    simulate_error_code("code_0");
    assert!(distinct_gauge() as usize <= 40);
}
