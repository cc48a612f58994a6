//! Property-based tests for the listing order and paging invariants
//!
//! This module uses the proptest crate to verify the booking listing
//! helpers across a wide range of randomly generated inputs. The ordering
//! and page arithmetic are pure functions, which makes them a good fit for
//! properties rather than hand-picked examples.

use proptest::prelude::*;

use chrono::Utc;
use item_booking::booking::{Booking, State, Status};
use item_booking::store::{PageRequest, order_and_page};
use item_booking::time::TimeStamp;

// PROPERTY TEST STRATEGIES

/// Strategy to generate a timestamp somewhere inside one month
fn timestamp_strategy() -> impl Strategy<Value = TimeStamp<Utc>> {
    (1u32..=28, 0u32..=23, 0u32..=59)
        .prop_map(|(day, hour, minute)| TimeStamp::new_with(2024, 6, day, hour, minute, 0))
}

/// Strategy to generate a booking with a well-formed interval
fn booking_strategy() -> impl Strategy<Value = Booking> {
    (
        0u64..1000,
        timestamp_strategy(),
        1i64..=96,
        0u64..50,
        0u64..50,
        0u8..=2,
    )
        .prop_map(|(id, start, hours, item_id, booker_id, status)| Booking {
            id,
            end: start.offset_hours(hours),
            start,
            item_id,
            booker_id,
            status: match status {
                0 => Status::Waiting,
                1 => Status::Approved,
                _ => Status::Rejected,
            },
        })
}

fn bookings_strategy() -> impl Strategy<Value = Vec<Booking>> {
    prop::collection::vec(booking_strategy(), 0..40)
}

/// Strategy for valid paging parameters
fn page_strategy() -> impl Strategy<Value = (i64, i64)> {
    (0i64..200, 1i64..=20)
}

// PROPERTY TESTS
proptest! {
    /// Property: every page of a listing is ordered newest start first
    #[test]
    fn prop_listing_pages_are_newest_first(
        bookings in bookings_strategy(),
        (from, size) in page_strategy()
    ) {
        let page = PageRequest::new(from, size).unwrap();
        let listed = order_and_page(bookings, page);

        for pair in listed.windows(2) {
            prop_assert!(
                pair[0].start >= pair[1].start,
                "listing must be newest first: {:?} before {:?}",
                pair[0].start, pair[1].start
            );
        }
    }

    /// Property: a page never exceeds the requested size and only holds
    /// records that were in the input
    #[test]
    fn prop_page_respects_size_and_membership(
        bookings in bookings_strategy(),
        (from, size) in page_strategy()
    ) {
        let page = PageRequest::new(from, size).unwrap();
        let listed = order_and_page(bookings.clone(), page);

        prop_assert!(listed.len() <= size as usize, "page larger than requested size");
        for booking in &listed {
            prop_assert!(
                bookings.contains(booking),
                "page contains a booking that was never stored"
            );
        }
    }

    /// Property: walking the listing page by page reassembles the whole
    /// ordered listing, with nothing lost or duplicated
    #[test]
    fn prop_page_walk_reassembles_the_listing(
        bookings in bookings_strategy(),
        size in 1i64..=10
    ) {
        let everything = order_and_page(bookings.clone(), PageRequest::new(0, 10_000).unwrap());

        let mut walked = Vec::new();
        let mut from = 0i64;
        loop {
            let page = order_and_page(bookings.clone(), PageRequest::new(from, size).unwrap());
            if page.is_empty() {
                break;
            }
            walked.extend(page);
            from += size;
        }

        prop_assert_eq!(walked, everything);
    }

    /// Property: an offset inside a page behaves exactly like the page
    /// boundary below it. This is the documented snapping behavior of the
    /// offset-to-page translation.
    #[test]
    fn prop_offsets_snap_to_page_boundaries(
        bookings in bookings_strategy(),
        (from, size) in page_strategy()
    ) {
        let snapped = (from / size) * size;
        let at_offset = order_and_page(bookings.clone(), PageRequest::new(from, size).unwrap());
        let at_boundary = order_and_page(bookings, PageRequest::new(snapped, size).unwrap());

        prop_assert_eq!(at_offset, at_boundary);
    }

    /// Property: the computed page number brackets the offset from below
    #[test]
    fn prop_page_number_brackets_the_offset(from in 0i64..100_000, size in 1i64..1_000) {
        let page = PageRequest::new(from, size).unwrap();

        prop_assert_eq!(page.size, size as usize);
        if from == 0 {
            prop_assert_eq!(page.page, 0);
        } else {
            let lower = (page.page * page.size) as i64;
            prop_assert!(lower <= from, "page start {} above offset {}", lower, from);
            prop_assert!(from < lower + size, "offset {} beyond page end {}", from, lower + size);
        }
    }

    /// Property: negative offsets and non-positive sizes are always refused
    #[test]
    fn prop_bad_paging_is_always_refused(from in i64::MIN..0, size in i64::MIN..=0) {
        prop_assert!(PageRequest::new(from, 10).is_err());
        prop_assert!(PageRequest::new(0, size).is_err());
    }

    /// Property: only the six canonical uppercase tokens parse to a known
    /// filter, everything else is flagged unknown and nothing panics
    #[test]
    fn prop_state_parse_accepts_only_canonical_tokens(raw in "[A-Za-z_]{0,16}") {
        let known = ["ALL", "CURRENT", "PAST", "FUTURE", "WAITING", "REJECTED"];
        let parsed = State::parse(&raw);

        if known.contains(&raw.as_str()) {
            prop_assert_ne!(parsed, State::Unknown);
        } else {
            prop_assert_eq!(parsed, State::Unknown);
        }
    }
}
