use minio_init_core::contract::{
    GroupInfo, ItemStatus, MockStorageAdminClient, SettingChange, UpsertOutcome,
};
use minio_init_core::error::AdminError;
use minio_init_core::report::CollectingReporter;
use minio_init_core::resources::{AnonymousAccess, RetentionMode, Validity};
use minio_init_core::tasks::{buckets, groups, policies, service_accounts, users, ApplyOutcome};
use serde_json::json;

/// An empty item list never touches the client (the mock has no expectations).
#[tokio::test]
async fn test_empty_items_skip_without_calls() {
    let client = MockStorageAdminClient::new();
    let reporter = CollectingReporter::new();

    let result = buckets::apply(&[], &client, &reporter).await;
    assert_eq!(result.outcome, ApplyOutcome::Skipped);
    assert_eq!(result.message, "No buckets configured");

    let result = service_accounts::apply(&[], &client, &reporter).await;
    assert_eq!(result.outcome, ApplyOutcome::Skipped);
}

/// A new bucket is created with object-lock and region in a single call,
/// and retention is set with the declared mode and validity.
#[tokio::test]
async fn test_bucket_created_with_lock_and_retention() {
    let mut client = MockStorageAdminClient::new();
    client.expect_bucket_exists().times(1).returning(|_| Ok(false));
    client
        .expect_create_bucket()
        .times(1)
        .withf(|b| b.name == "archive" && b.object_lock && b.region.as_deref() == Some("eu-west-1"))
        .returning(|_| Ok(()));
    client
        .expect_set_versioning()
        .times(1)
        .withf(|_, enabled| *enabled)
        .returning(|_, _| Ok(SettingChange::Unchanged));
    client
        .expect_set_retention()
        .times(1)
        .withf(|_, r| r.mode == RetentionMode::Governance && r.validity == Validity::Years(1))
        .returning(|_, _| Ok(SettingChange::Changed));
    client
        .expect_set_anonymous_access()
        .times(1)
        .withf(|_, access| *access == AnonymousAccess::Private)
        .returning(|_, _| Ok(SettingChange::Unchanged));

    let items = vec![json!({
        "name": "archive",
        "region": "eu-west-1",
        "object_lock": true,
        "retention": {"mode": "governance", "years": 1}
    })];
    let reporter = CollectingReporter::new();
    let result = buckets::apply(&items, &client, &reporter).await;

    assert_eq!(result.outcome, ApplyOutcome::Applied);
    assert_eq!(result.tally.created, 1);
    assert!(reporter
        .items(ItemStatus::Created)
        .contains(&"Created bucket: archive (with object-lock)".to_string()));
}

/// An existing bucket cannot gain object-lock, so a retention rejection there
/// is a warning with a hint, and the run still converges.
#[tokio::test]
async fn test_retention_rejected_on_existing_bucket_warns() {
    let mut client = MockStorageAdminClient::new();
    client.expect_bucket_exists().returning(|_| Ok(true));
    client
        .expect_set_versioning()
        .returning(|_, _| Ok(SettingChange::Unchanged));
    client
        .expect_set_retention()
        .returning(|_, _| Err(AdminError::Rejected("bucket is missing object lock configuration".into())));
    client
        .expect_set_anonymous_access()
        .returning(|_, _| Ok(SettingChange::Unchanged));

    let items = vec![json!({"name": "b", "object_lock": true, "retention": {"days": 7}})];
    let reporter = CollectingReporter::new();
    let result = buckets::apply(&items, &client, &reporter).await;

    assert_eq!(result.outcome, ApplyOutcome::Unchanged);
    assert_eq!(result.tally.warnings, 2);
    assert_eq!(result.tally.failed, 0);
    assert!(reporter
        .items(ItemStatus::Warning)
        .iter()
        .any(|w| w.contains("retention requires object_lock")));
}

/// Retention rejected on a bucket just created with object-lock is a real failure.
#[tokio::test]
async fn test_retention_failure_on_new_locked_bucket_fails_item() {
    let mut client = MockStorageAdminClient::new();
    client.expect_bucket_exists().returning(|_| Ok(false));
    client.expect_create_bucket().times(1).returning(|_| Ok(()));
    client
        .expect_set_versioning()
        .returning(|_, _| Ok(SettingChange::Unchanged));
    client
        .expect_set_retention()
        .returning(|_, _| Err(AdminError::Rejected("invalid retention period".into())));
    client
        .expect_set_anonymous_access()
        .returning(|_, _| Ok(SettingChange::Unchanged));

    let items = vec![json!({"name": "b", "object_lock": true, "retention": {"days": 7}})];
    let reporter = CollectingReporter::new();
    let result = buckets::apply(&items, &client, &reporter).await;

    assert_eq!(result.outcome, ApplyOutcome::Failed);
    assert_eq!(result.tally.warnings, 0);
    assert_eq!(result.tally.failed, 1);
    assert!(reporter.items(ItemStatus::Failed)[0].contains("invalid retention period"));
}

/// A failed existence check fails the item without any further call.
#[tokio::test]
async fn test_bucket_lookup_error_stops_item() {
    let mut client = MockStorageAdminClient::new();
    client
        .expect_bucket_exists()
        .returning(|_| Err(AdminError::Transport("connection refused".into())));

    let items = vec![json!({"name": "x", "quota": {"size": "1GB"}})];
    let reporter = CollectingReporter::new();
    let result = buckets::apply(&items, &client, &reporter).await;

    assert_eq!(result.outcome, ApplyOutcome::Failed);
    assert!(reporter.items(ItemStatus::Failed)[0].contains("connection refused"));
}

/// Policies are created when absent and replaced when present.
#[tokio::test]
async fn test_policy_create_and_replace_paths() {
    let mut client = MockStorageAdminClient::new();
    client
        .expect_policy_exists()
        .returning(|name| Ok(name == "existing"));
    client
        .expect_create_policy()
        .times(1)
        .withf(|name, doc| name == "fresh" && doc["Version"] == "2012-10-17")
        .returning(|_, _| Ok(()));
    client
        .expect_replace_policy()
        .times(1)
        .withf(|name, _| name == "existing")
        .returning(|_, _| Ok(SettingChange::Changed));

    let items = vec![
        json!({"name": "fresh", "statements": [{"Effect": "Allow"}]}),
        json!({"name": "existing", "statements": [{"Effect": "Deny"}]}),
    ];
    let reporter = CollectingReporter::new();
    let result = policies::apply(&items, &client, &reporter).await;

    assert_eq!(result.outcome, ApplyOutcome::Applied);
    assert_eq!(
        result.message,
        "2 policy/policies processed (1 created, 1 updated)"
    );
}

/// A user whose creation fails is not added to groups; the next user still runs.
#[tokio::test]
async fn test_user_failure_skips_memberships() {
    let mut client = MockStorageAdminClient::new();
    client.expect_upsert_user().returning(|user, _| {
        if user == "broken" {
            Err(AdminError::Rejected("access key too short".into()))
        } else {
            Ok(UpsertOutcome::Created)
        }
    });
    client
        .expect_group_add_member()
        .times(1)
        .withf(|group, user| group == "devs" && user == "good")
        .returning(|_, _| Ok(SettingChange::Changed));

    let items = vec![
        json!({"access_key": "broken", "secret_key": "x", "groups": ["devs"]}),
        json!({"access_key": "good", "secret_key": "y", "groups": ["devs"]}),
    ];
    let reporter = CollectingReporter::new();
    let result = users::apply(&items, &client, &reporter).await;

    assert_eq!(result.outcome, ApplyOutcome::Failed);
    assert_eq!(result.tally.created, 1);
    assert_eq!(result.tally.failed, 1);
    assert!(reporter
        .items(ItemStatus::Failed)
        .iter()
        .any(|m| m.contains("access key too short")));
}

/// Attaching a missing policy to an existing group fails that group.
#[tokio::test]
async fn test_group_attach_failure_is_counted() {
    let mut client = MockStorageAdminClient::new();
    client.expect_group_info().returning(|name| {
        Ok(Some(GroupInfo {
            name: name.to_string(),
            members: vec!["alice".to_string()],
            policies: vec![],
        }))
    });
    client
        .expect_attach_group_policy()
        .returning(|_, policy| {
            if policy == "ghost" {
                Err(AdminError::NotFound("policy 'ghost'".into()))
            } else {
                Ok(SettingChange::Unchanged)
            }
        });

    let items = vec![json!({"name": "team", "policies": ["readonly", "ghost"]})];
    let reporter = CollectingReporter::new();
    let result = groups::apply(&items, &client, &reporter).await;

    assert_eq!(result.outcome, ApplyOutcome::Failed);
    assert!(result.message.starts_with("1 group(s) processed (0 policies attached)"));
}

/// An existing access key is reported unchanged, other errors fail.
#[tokio::test]
async fn test_service_account_dispositions() {
    let mut client = MockStorageAdminClient::new();
    client
        .expect_create_service_account()
        .returning(|account| match account.access_key.as_str() {
            "existing" => Err(AdminError::AlreadyExists("service account".into())),
            "orphan" => Err(AdminError::NotFound("user 'nobody'".into())),
            _ => Ok(()),
        });

    let items = vec![
        json!({"user": "app", "access_key": "existing", "secret_key": "s"}),
        json!({"user": "nobody", "access_key": "orphan", "secret_key": "s"}),
        json!({"user": "app", "access_key": "new", "secret_key": "s", "name": "", "description": "desc"}),
    ];
    let reporter = CollectingReporter::new();
    let result = service_accounts::apply(&items, &client, &reporter).await;

    assert_eq!(result.tally.unchanged, 1);
    assert_eq!(result.tally.failed, 1);
    assert_eq!(result.tally.created, 1);
    assert_eq!(result.outcome, ApplyOutcome::Failed);
    assert_eq!(
        result.message,
        "3 service account(s) processed (1 created), 1 failed"
    );
}
