//! Loan lifecycle tests over the in-memory repository

mod common;

use athenaeum_server::{config::LoansConfig, error::AppError};
use common::{add_book, add_user, setup, setup_with_loans_config};

#[tokio::test]
async fn issuing_decrements_the_ledger_and_returning_restores_it() {
    let (repository, services) = setup();
    let book = add_book(&repository, "The Left Hand of Darkness", "978-0-441-47812-5", 3).await;
    let user = add_user(&repository, "genly@ekumen.example", "Genly Ai").await;

    let loan = services.loans.issue_loan(book.id, user.id, 14).await.unwrap();
    assert_eq!((loan.due_date - loan.loan_date).num_days(), 14);
    assert!(loan.return_date.is_none());
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 2);

    let returned = services.loans.return_loan(loan.id, None).await.unwrap();
    assert!(returned.return_date.is_some());
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 3);
}

#[tokio::test]
async fn a_user_cannot_hold_two_open_loans_for_the_same_book() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Foundation", "978-0-553-29335-9", 5).await;
    let user = add_user(&repository, "hari@trantor.example", "Hari Seldon").await;

    let loan = services.loans.issue_loan(book.id, user.id, 7).await.unwrap();

    let err = services.loans.issue_loan(book.id, user.id, 7).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 4);

    // Returning the copy clears the way for a new loan
    services.loans.return_loan(loan.id, None).await.unwrap();
    services.loans.issue_loan(book.id, user.id, 7).await.unwrap();
}

#[tokio::test]
async fn issuing_an_exhausted_book_fails_without_mutating_state() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Solaris", "978-0-15-683750-3", 1).await;
    let first = add_user(&repository, "kris@station.example", "Kris Kelvin").await;
    let second = add_user(&repository, "snaut@station.example", "Snaut").await;

    services.loans.issue_loan(book.id, first.id, 7).await.unwrap();

    let err = services.loans.issue_loan(book.id, second.id, 7).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 0);
    assert_eq!(services.loans.count_active().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_issuers_of_the_last_copy_serialize() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Neuromancer", "978-0-441-56956-4", 1).await;
    let first = add_user(&repository, "case@sprawl.example", "Case").await;
    let second = add_user(&repository, "molly@sprawl.example", "Molly Millions").await;

    let svc_a = services.loans.clone();
    let svc_b = services.loans.clone();
    let book_id = book.id;
    let (a, b) = tokio::join!(
        tokio::spawn(async move { svc_a.issue_loan(book_id, first.id, 7).await }),
        tokio::spawn(async move { svc_b.issue_loan(book_id, second.id, 7).await }),
    );
    let results = [a.unwrap(), b.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppError::Unavailable(_))));
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 0);
}

#[tokio::test]
async fn double_return_conflicts_and_moves_the_ledger_only_once() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Roadside Picnic", "978-0-575-07053-9", 2).await;
    let user = add_user(&repository, "red@zone.example", "Redrick Schuhart").await;

    let loan = services.loans.issue_loan(book.id, user.id, 10).await.unwrap();
    services.loans.return_loan(loan.id, None).await.unwrap();

    let err = services.loans.return_loan(loan.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 2);
}

#[tokio::test]
async fn two_copy_lifecycle_matches_the_reference_walkthrough() {
    let (repository, services) = setup();
    let book = add_book(&repository, "A Wizard of Earthsea", "978-0-547-77374-2", 2).await;
    let user_a = add_user(&repository, "ged@roke.example", "Ged").await;
    let user_b = add_user(&repository, "vetch@roke.example", "Vetch").await;
    let user_c = add_user(&repository, "jasper@roke.example", "Jasper").await;

    let loan_a = services.loans.issue_loan(book.id, user_a.id, 14).await.unwrap();
    assert_eq!((loan_a.due_date - loan_a.loan_date).num_days(), 14);
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 1);

    services.loans.issue_loan(book.id, user_b.id, 7).await.unwrap();
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 0);

    let err = services.loans.issue_loan(book.id, user_c.id, 7).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));

    let returned = services.loans.return_loan(loan_a.id, None).await.unwrap();
    assert!(returned.return_date.is_some());
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 1);
}

#[tokio::test]
async fn only_the_owner_may_return_when_a_requesting_user_is_given() {
    let (repository, services) = setup();
    let book = add_book(&repository, "The Dispossessed", "978-0-06-051275-3", 1).await;
    let owner = add_user(&repository, "shevek@anarres.example", "Shevek").await;
    let other = add_user(&repository, "sabul@anarres.example", "Sabul").await;

    let loan = services.loans.issue_loan(book.id, owner.id, 21).await.unwrap();

    let err = services
        .loans
        .return_loan(loan.id, Some(other.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(services.loans.get_loan(loan.id).await.unwrap().is_open());

    services.loans.return_loan(loan.id, Some(owner.id)).await.unwrap();
}

#[tokio::test]
async fn renewing_extends_the_due_date_of_an_open_loan() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Ubik", "978-0-547-57229-1", 1).await;
    let user = add_user(&repository, "joe@runciter.example", "Joe Chip").await;

    let loan = services.loans.issue_loan(book.id, user.id, 7).await.unwrap();

    let renewed = services.loans.renew_loan(loan.id, 7).await.unwrap();
    assert_eq!(renewed.due_date, loan.due_date + chrono::Duration::days(7));
    assert_eq!(renewed.renewals, 1);

    let err = services.loans.renew_loan(loan.id, 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    services.loans.return_loan(loan.id, None).await.unwrap();
    let err = services.loans.renew_loan(loan.id, 7).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn configured_renewal_cap_limits_renewals() {
    let (repository, services) = setup_with_loans_config(LoansConfig {
        max_renewals: Some(2),
    });
    let book = add_book(&repository, "Blindsight", "978-0-7653-1964-7", 1).await;
    let user = add_user(&repository, "siri@theseus.example", "Siri Keeton").await;

    let loan = services.loans.issue_loan(book.id, user.id, 7).await.unwrap();
    services.loans.renew_loan(loan.id, 7).await.unwrap();
    services.loans.renew_loan(loan.id, 7).await.unwrap();

    let err = services.loans.renew_loan(loan.id, 7).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn issue_preconditions_report_typed_failures() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Annihilation", "978-0-374-10409-2", 1).await;
    let user = add_user(&repository, "biologist@areax.example", "The Biologist").await;

    let err = services.loans.issue_loan(book.id, user.id, 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let err = services.loans.issue_loan(9999, user.id, 7).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services.loans.issue_loan(book.id, 9999, 7).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Nothing above touched the ledger
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 1);
}

#[tokio::test]
async fn loan_queries_project_current_state() {
    let (repository, services) = setup();
    let slow = add_book(&repository, "Anathem", "978-0-06-147409-5", 1).await;
    let fast = add_book(&repository, "Snow Crash", "978-0-553-38095-8", 1).await;
    let user = add_user(&repository, "hiro@metaverse.example", "Hiro").await;

    let long_loan = services.loans.issue_loan(slow.id, user.id, 30).await.unwrap();
    let short_loan = services.loans.issue_loan(fast.id, user.id, 3).await.unwrap();

    // Active loans are ordered by soonest due date
    let active = services.loans.get_active_loans().await.unwrap();
    assert_eq!(
        active.iter().map(|l| l.id).collect::<Vec<_>>(),
        vec![short_loan.id, long_loan.id]
    );
    assert!(active.iter().all(|l| !l.is_overdue));
    assert_eq!(services.loans.count_overdue().await.unwrap(), 0);

    // History is most recent first and keeps closed loans
    services.loans.return_loan(long_loan.id, None).await.unwrap();
    let history = services.loans.get_user_loans(user.id).await.unwrap();
    assert_eq!(
        history.iter().map(|l| l.id).collect::<Vec<_>>(),
        vec![short_loan.id, long_loan.id]
    );

    let current = services.loans.get_user_current_loans(user.id).await.unwrap();
    assert_eq!(current.iter().map(|l| l.id).collect::<Vec<_>>(), vec![short_loan.id]);
    assert!(services.loans.has_user_borrowed(user.id, fast.id).await.unwrap());
    assert!(!services.loans.has_user_borrowed(user.id, slow.id).await.unwrap());
}

#[tokio::test]
async fn users_with_open_loans_cannot_be_deleted() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Consider Phlebas", "978-0-316-00538-8", 1).await;
    let user = add_user(&repository, "horza@culture.example", "Horza").await;

    let loan = services.loans.issue_loan(book.id, user.id, 7).await.unwrap();

    let err = services.users.delete_user(user.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    services.loans.return_loan(loan.id, None).await.unwrap();
    services.users.delete_user(user.id).await.unwrap();
    assert!(!services.users.user_exists(user.id).await.unwrap());
}

#[tokio::test]
async fn books_with_copies_on_loan_cannot_be_deleted() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Excession", "978-0-553-57537-8", 2).await;
    let user = add_user(&repository, "genar@culture.example", "Genar-Hofoen").await;

    let loan = services.loans.issue_loan(book.id, user.id, 7).await.unwrap();

    let err = services.catalog.delete_book(book.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    services.loans.return_loan(loan.id, None).await.unwrap();
    services.catalog.delete_book(book.id).await.unwrap();
}
