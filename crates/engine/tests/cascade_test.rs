//! Integration tests for the hybrid recommendation cascade.
//!
//! These tests exercise the engine end to end: entity registration,
//! rating propagation, model rebuilds, and the stage-by-stage fallback
//! behavior of `get_recommendations`.

use anyhow::Result;
use catalog::{Book, User};
use engine::RecommendationEngine;

fn create_test_engine() -> RecommendationEngine {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // Catalog of 5 books across 2 categories, with rating history so the
    // aggregate-based stages have something to rank.
    let books = vec![
        Book::with_rating_history("b1", "Galactic War", "A. Author", "SciFi", "space empire galactic war fleet", 4.8, 25),
        Book::with_rating_history("b2", "Star Fleet", "B. Author", "SciFi", "galactic space adventure war fleet", 4.2, 40),
        Book::with_rating_history("b3", "Deep Orbit", "C. Author", "SciFi", "space station orbit mystery", 3.9, 12),
        Book::with_rating_history("b4", "Pasta Nights", "D. Author", "Cooking", "pasta recipes kitchen dinner", 4.5, 8),
        Book::with_rating_history("b5", "Bread Basics", "E. Author", "Cooking", "baking bread kitchen flour", 3.2, 50),
    ];
    let users = vec![
        User::new(1, "alice", "pw"),
        User::new(2, "bob", "pw"),
        User::new(3, "carol", "pw"),
    ];
    RecommendationEngine::from_entities(books, users)
}

#[test]
fn cold_user_with_preferences_gets_category_books_first() {
    let mut engine = create_test_engine();

    // dana has zero ratings and one preferred category: CF has no signal,
    // so her preferred SciFi books must fill the result ahead of the rest.
    let mut user = User::new(10, "dana", "pw");
    user.add_preference("SciFi");
    engine.add_user(user);

    let recs = engine.get_recommendations("dana", 3);
    let ids: Vec<&str> = recs.iter().map(|b| b.id.as_str()).collect();

    // The two mutually similar space-war titles lead, the loosely related
    // orbit mystery follows; no Cooking book sneaks in.
    assert!(ids[..2].contains(&"b1") && ids[..2].contains(&"b2"));
    assert_eq!(ids[2], "b3");
}

#[test]
fn preference_stage_tops_up_after_content_runs_dry() {
    let mut engine = create_test_engine();

    // erin liked one SciFi book and prefers Cooking. The content stage can
    // only offer textually similar books (the other SciFi titles); the
    // preference stage must then supply the Cooking books, best first.
    let mut fan = User::new(12, "erin", "pw");
    fan.add_preference("Cooking");
    engine.add_user(fan);
    engine.rate("erin", "b1", 5.0).unwrap();

    let recs = engine.get_recommendations("erin", 4);
    let ids: Vec<&str> = recs.iter().map(|b| b.id.as_str()).collect();

    // Content contributes b2 and b3 (similar to the liked b1); the
    // preference stage appends b4 before b5 (4.5 average beats 3.2).
    assert_eq!(ids.len(), 4);
    assert!(ids[..2].contains(&"b2") && ids[..2].contains(&"b3"));
    assert_eq!(&ids[2..], &["b4", "b5"]);
}

#[test]
fn rerating_overwrites_instead_of_double_counting() {
    let mut engine = create_test_engine();
    let before = engine.get_book("b1").unwrap().rating_count();

    engine.rate("alice", "b1", 5.0).unwrap();
    engine.rate("alice", "b1", 3.0).unwrap();

    let book = engine.get_book("b1").unwrap();
    // One reader, one rating: the 5.0 was retracted when the 3.0 landed
    assert_eq!(book.rating_count(), before + 1);
    assert_eq!(engine.get_user("alice").unwrap().get_rating("b1"), Some(3.0));

    let expected = (4.8 * before as f32 + 3.0) / (before + 1) as f32;
    assert!((book.average_rating() - (expected * 100.0).round() / 100.0).abs() < 1e-3);
}

#[test]
fn identical_rating_vectors_are_fully_similar() {
    let mut engine = create_test_engine();
    for username in ["alice", "bob"] {
        engine.rate(username, "b1", 5.0).unwrap();
        engine.rate(username, "b2", 3.0).unwrap();
        engine.rate(username, "b3", 4.0).unwrap();
    }
    engine.rebuild_models();

    let sim = engine.user_similarity_matrix().unwrap();
    // alice is row 0, bob row 1
    assert!((sim[0][1] - 1.0).abs() < 1e-6);
    assert!((sim[1][0] - 1.0).abs() < 1e-6);
}

#[test]
fn cold_start_user_falls_through_to_top_rated_and_random_fill() {
    // Catalog of 10 books, user with no ratings and no preferences.
    let books: Vec<Book> = (1..=10)
        .map(|i| Book::with_rating_history(format!("b{i}"), format!("Book {i}"), "A", "Fiction", "", 3.0, i))
        .collect();
    let users = vec![User::new(1, "newbie", "pw")];
    let mut engine = RecommendationEngine::from_entities(books, users);

    // n larger than the catalog: exactly min(n, 10) distinct books
    let recs = engine.get_recommendations("newbie", 25);
    assert_eq!(recs.len(), 10);

    let mut ids: Vec<&str> = recs.iter().map(|b| b.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}

#[test]
fn collaborative_stage_engages_after_enough_ratings() {
    let mut engine = create_test_engine();

    // bob agrees with alice on three books and also loved b4
    for (book, value) in [("b1", 5.0), ("b2", 4.0), ("b3", 3.0), ("b4", 5.0)] {
        engine.rate("bob", book, value).unwrap();
    }
    for (book, value) in [("b1", 5.0), ("b2", 4.0), ("b3", 3.0)] {
        engine.rate("alice", book, value).unwrap();
    }

    let recs = engine.get_recommendations("alice", 2);
    // b4 comes out of the collaborative stage ahead of everything else
    assert_eq!(recs[0].id, "b4");
    for book in &recs {
        assert!(!["b1", "b2", "b3"].contains(&book.id.as_str()));
    }
}

#[test]
fn cascade_never_exceeds_n_or_duplicates() {
    let mut engine = create_test_engine();
    for (book, value) in [("b1", 5.0), ("b2", 4.0), ("b3", 2.0)] {
        engine.rate("carol", book, value).unwrap();
    }
    let mut user = User::new(11, "carol2", "pw");
    user.add_preference("Cooking");
    engine.add_user(user);

    for (username, n) in [("carol", 2), ("carol", 10), ("carol2", 4)] {
        let recs = engine.get_recommendations(username, n);
        assert!(recs.len() <= n);

        let mut ids: Vec<&str> = recs.iter().map(|b| b.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), recs.len(), "duplicate recommendation for {username}");
    }
}

#[test]
fn rating_after_new_book_is_reconciled_on_next_request() -> Result<()> {
    let mut engine = create_test_engine();
    for (book, value) in [("b1", 5.0), ("b2", 4.0), ("b3", 3.0)] {
        engine.rate("alice", book, value)?;
    }

    // b6 arrives after the last rebuild; rating it forces a reconcile
    engine.add_book(Book::new("b6", "Late Arrival", "F", "SciFi", "space war saga"))?;
    engine.rate("bob", "b6", 5.0)?;

    let recs = engine.get_recommendations("alice", 5);
    assert!(!recs.is_empty());
    // The rebuilt models know about b6
    let sim = engine.book_similarity_matrix().unwrap();
    assert_eq!(sim.len(), 6);
    Ok(())
}
