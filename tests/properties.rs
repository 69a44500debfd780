//! Property-based checks for argument handling and task preconditions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use proptest::prelude::*;

use common::*;
use srvadm::config::split_plugins;
use srvadm::tasks::service::ServiceAction;
use srvadm::tasks::user::add_user;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(future)
}

proptest! {
    /// Every non-zero integer restarts.
    #[test]
    fn prop_nonzero_restart_flag_restarts(flag in any::<i64>().prop_filter("non-zero", |n| *n != 0)) {
        prop_assert_eq!(
            ServiceAction::from_restart_flag(&flag.to_string()),
            ServiceAction::Restart
        );
    }

    /// Text that is not an integer restarts as well.
    #[test]
    fn prop_non_numeric_restart_flag_restarts(flag in "[a-zA-Z][a-zA-Z0-9]{0,10}") {
        prop_assert_eq!(ServiceAction::from_restart_flag(&flag), ServiceAction::Restart);
    }

    /// Usernames missing from the users section abort, name the user and
    /// never reach the host.
    #[test]
    fn prop_unknown_user_aborts_without_remote_calls(user in "[a-z_][a-z0-9_-]{0,15}") {
        prop_assume!(user != "alice" && user != "bob");

        let config = default_config();
        let host = FakeHost::new();
        let prompter = ScriptedPrompter::silent();
        let ctx = context(&config, &host, &prompter);

        let err = block_on(add_user(&ctx, &user)).unwrap_err();

        prop_assert!(err.to_string().contains(&user));
        prop_assert!(host.issued().is_empty());
    }

    /// Empty entries never survive plugin list splitting.
    #[test]
    fn prop_plugin_split_drops_blanks(names in prop::collection::vec("[a-z]{1,8}|[ ]{0,3}", 0..8)) {
        let list = names.join(",");
        let expected: Vec<String> = names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        prop_assert_eq!(split_plugins(&list), expected);
    }
}

#[test]
fn zero_reloads() {
    assert_eq!(ServiceAction::from_restart_flag("0"), ServiceAction::Reload);
}
