//! Property tests for locator memoization and selectors.

mod common;

use std::time::Duration;

use patient_locator::{By, FindBy};
use proptest::prelude::*;

use common::Screen;

proptest! {
    #[test]
    fn test_same_index_and_timeout_share_element(index in 0usize..8, millis in 0u64..5_000) {
        let screen = Screen::new();
        let driver = screen.driver();
        let locator = driver.find(By::css(".item"));
        let timeout = Duration::from_millis(millis);

        let first = locator.nth_within(index, timeout);
        let second = locator.nth_within(index, timeout);
        prop_assert!(first.same_as(&second));
        prop_assert_eq!(first.index(), index);
        prop_assert_eq!(first.timeout(), timeout);

        let other = locator.nth_within(index + 1, timeout);
        prop_assert!(!first.same_as(&other));
    }

    #[test]
    fn test_lazy_elements_never_touch_driver(count in 1usize..16) {
        let screen = Screen::new();
        let driver = screen.driver();
        let locator = driver.find(By::id("lazy"));
        for index in 0..count {
            let _ = locator.nth(index);
        }
        prop_assert_eq!(screen.lookups(), 0);
        prop_assert_eq!(screen.sessions(), 0);
    }

    #[test]
    fn test_single_strategy_annotation_selects(value in "[a-z][a-z0-9_-]{0,12}") {
        let by = FindBy::accessibility_id(value.clone()).selector().unwrap();
        prop_assert_eq!(by, By::accessibility_id(value));
    }
}
