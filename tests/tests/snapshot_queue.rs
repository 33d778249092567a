use payout_snapshot_queue::{
    Config,
    ProcessingReport,
    Trigger,
    failure::LOG_RESPONSE_SIZE_EXCEEDED,
    ports::{
        AssetSnapshotRepository,
        MerkleTreeRepository,
    },
};
use payout_snapshot_services::{
    Service,
    State,
};
use payout_snapshot_types::{
    HashFunction,
    MerkleTree,
    entities::{
        AssetSnapshotData,
        AssetSnapshotFailureCause,
        AssetSnapshotStatus,
        FetchMerkleTreePathParams,
    },
    primitives::{
        AssetSnapshotId,
        Balance,
        BlockNumber,
        ProjectId,
    },
    test_helpers::balance,
};
use pretty_assertions::assert_eq;
use std::{
    collections::HashSet,
    time::Duration,
};
use test_case::test_case;
use test_helpers::{
    CHAIN_ID,
    TestContext,
    asset,
    snapshot_params,
};

fn manual() -> Config {
    Config {
        trigger: Trigger::Never,
    }
}

fn status(context: &TestContext, id: AssetSnapshotId) -> AssetSnapshotStatus {
    context
        .queue()
        .get_asset_snapshot_by_id(id)
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test(start_paused = true)]
async fn submitted_snapshot_is_processed_by_the_first_poll() {
    // Given
    let context = TestContext::new(Config::default());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    let project_id = context.create_project().unwrap();
    context.service.start_and_await().await.unwrap();

    // When
    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();

    // Then
    assert_eq!(status(&context, id), AssetSnapshotStatus::Pending);
    tokio::time::sleep(Duration::from_secs(14)).await;
    assert_eq!(status(&context, id), AssetSnapshotStatus::Pending);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(status(&context, id), AssetSnapshotStatus::Success);
    assert_eq!(context.service.stop_and_await().await.unwrap(), State::Stopped);
}

#[tokio::test(start_paused = true)]
async fn snapshot_submitted_between_polls_waits_for_the_next_poll() {
    let context = TestContext::new(Config::default());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    let project_id = context.create_project().unwrap();
    context.service.start_and_await().await.unwrap();
    tokio::time::sleep(Duration::from_secs(16)).await;

    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    let before_poll = status(&context, id);
    tokio::time::sleep(Duration::from_secs(2)).await;
    let after_poll = status(&context, id);

    assert_eq!(before_poll, AssetSnapshotStatus::Pending);
    assert_eq!(after_poll, AssetSnapshotStatus::Success);
}

#[tokio::test]
async fn successful_snapshot_exposes_total_root_and_pinned_tree() {
    // Given
    let context = TestContext::new(manual());
    let ignored = balance(0x99, 1_000);
    context.blockchain.set_holders(
        asset(),
        vec![
            balance(0x1, 100),
            balance(0x2, 0),
            balance(0x3, 400),
            ignored,
            balance(0x4, 500),
        ],
    );
    context.blockchain.deploy(asset(), Some(BlockNumber::new(10)));
    let project_id = context.create_project().unwrap();
    let mut params = snapshot_params(project_id, 2_000);
    params.ignored_holder_addresses.insert(ignored.address);
    let id = context.queue().submit_asset_snapshot(params).unwrap();

    // When
    let report = context.queue().process_snapshots().await.unwrap();

    // Then
    assert_eq!(
        report,
        ProcessingReport {
            succeeded: 1,
            failed: 0
        }
    );
    let expected = MerkleTree::new(
        vec![balance(0x1, 100), balance(0x3, 400), balance(0x4, 500)],
        HashFunction::Keccak256,
    )
    .unwrap();
    let snapshot = context.queue().get_asset_snapshot_by_id(id).unwrap().unwrap();
    let data = snapshot.data.unwrap();
    assert_eq!(data.total_asset_amount, Balance::from(1_000u64));
    assert_eq!(&data.merkle_root_hash, expected.root().hash());
    assert_eq!(data.merkle_tree_depth, 2);
    assert_eq!(data.hash_fn, HashFunction::Keccak256);

    let pinned = context.ipfs.pinned(&data.merkle_tree_ipfs_hash).unwrap();
    let pinned_tree: MerkleTree = serde_json::from_value(pinned).unwrap();
    assert_eq!(pinned_tree, expected);

    let requests = context.blockchain.balance_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].chain_spec.chain_id, CHAIN_ID);
    assert_eq!(requests[0].start_block, BlockNumber::new(10));
    assert_eq!(requests[0].end_block, BlockNumber::new(2_000));
}

#[tokio::test]
async fn snapshot_of_undeployed_contract_scans_from_genesis() {
    let context = TestContext::new(manual());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    let project_id = context.create_project().unwrap();
    context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();

    context.queue().process_snapshots().await.unwrap();

    let requests = context.blockchain.balance_requests();
    assert_eq!(requests[0].start_block, BlockNumber::new(0));
}

#[tokio::test]
async fn identical_holder_sets_share_one_stored_tree() {
    // Given
    let context = TestContext::new(manual());
    context
        .blockchain
        .set_holders(asset(), vec![balance(0x1, 5), balance(0x2, 7)]);
    let project_id = context.create_project().unwrap();
    let first = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();
    let second = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 200))
        .unwrap();

    // When
    let report = context.queue().process_snapshots().await.unwrap();

    // Then
    assert_eq!(report.succeeded, 2);
    assert_eq!(context.trees.len(), 1);
    let tree_id = |id| match context.snapshots.get_by_id(id).unwrap().unwrap().data {
        AssetSnapshotData::Successful(data) => data.merkle_tree_root_id,
        data => panic!("snapshot is not successful: {data:?}"),
    };
    assert_eq!(tree_id(first), tree_id(second));
    assert_eq!(
        context.trees.block_number(tree_id(first)),
        Some(BlockNumber::new(100))
    );
}

#[tokio::test]
async fn holder_lookup_in_stored_tree() {
    let context = TestContext::new(manual());
    context
        .blockchain
        .set_holders(asset(), vec![balance(0x1, 5), balance(0x2, 7)]);
    let project_id = context.create_project().unwrap();
    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();
    context.queue().process_snapshots().await.unwrap();
    let root_hash = context
        .queue()
        .get_asset_snapshot_by_id(id)
        .unwrap()
        .unwrap()
        .data
        .unwrap()
        .merkle_root_hash;
    let params = |address| FetchMerkleTreePathParams {
        root_hash: root_hash.clone(),
        chain_id: CHAIN_ID,
        asset_contract_address: asset(),
        wallet_address: balance(address, 0).address,
    };

    assert!(context.trees.contains_address(&params(0x2)).unwrap());
    assert!(!context.trees.contains_address(&params(0x3)).unwrap());
}

#[test_case(
    format!("{LOG_RESPONSE_SIZE_EXCEEDED}: query returned more than 10000 results"),
    AssetSnapshotFailureCause::LogResponseLimit;
    "provider log limit"
)]
#[test_case(
    "execution reverted".to_string(),
    AssetSnapshotFailureCause::Other;
    "generic rpc error"
)]
#[test_case(
    "log response size exceeded".to_string(),
    AssetSnapshotFailureCause::Other;
    "lowercase message"
)]
#[tokio::test]
async fn failed_balance_query_is_classified(
    message: String,
    expected_cause: AssetSnapshotFailureCause,
) {
    // Given
    let context = TestContext::new(manual());
    context.blockchain.fail_with(message);
    let project_id = context.create_project().unwrap();
    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();

    // When
    let report = context.queue().process_snapshots().await.unwrap();

    // Then
    assert_eq!(report.failed, 1);
    let snapshot = context.queue().get_asset_snapshot_by_id(id).unwrap().unwrap();
    assert_eq!(snapshot.status, AssetSnapshotStatus::Failed);
    assert_eq!(snapshot.failure_cause, Some(expected_cause));
    assert_eq!(snapshot.data, None);
}

#[tokio::test]
async fn snapshot_of_unknown_project_fails_with_other_cause() {
    let context = TestContext::new(manual());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(ProjectId::new_random(), 100))
        .unwrap();

    context.queue().process_snapshots().await.unwrap();

    let snapshot = context.queue().get_asset_snapshot_by_id(id).unwrap().unwrap();
    assert_eq!(snapshot.failure_cause, Some(AssetSnapshotFailureCause::Other));
    assert!(context.blockchain.balance_requests().is_empty());
}

#[tokio::test]
async fn failed_pinning_leaves_stored_tree_and_fails_snapshot() {
    let context = TestContext::new(manual());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    context.ipfs.fail_with("pinning service unavailable");
    let project_id = context.create_project().unwrap();
    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();

    context.queue().process_snapshots().await.unwrap();

    assert_eq!(status(&context, id), AssetSnapshotStatus::Failed);
    assert_eq!(context.ipfs.pinned_count(), 0);
    assert_eq!(context.trees.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_snapshot_is_not_retried() {
    // Given
    let context = TestContext::new(Config::default());
    context.blockchain.fail_with("connection refused");
    let project_id = context.create_project().unwrap();
    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();
    context.service.start_and_await().await.unwrap();
    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(status(&context, id), AssetSnapshotStatus::Failed);

    // When
    context.blockchain.recover();
    tokio::time::sleep(Duration::from_secs(60)).await;

    // Then
    assert_eq!(status(&context, id), AssetSnapshotStatus::Failed);
    assert_eq!(context.blockchain.balance_requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_processing_never_overlaps_with_itself() {
    // Given
    let context = TestContext::new(Config::default());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    context.blockchain.set_latency(Duration::from_secs(12));
    let project_id = context.create_project().unwrap();
    for block in [100, 200, 300] {
        context
            .queue()
            .submit_asset_snapshot(snapshot_params(project_id, block))
            .unwrap();
    }
    context.service.start_and_await().await.unwrap();

    // When
    let manual_run = context.queue().process_snapshots();
    let (manual_report, _) =
        tokio::join!(manual_run, tokio::time::sleep(Duration::from_secs(120)));

    // Then
    let manual_report = manual_report.unwrap();
    assert_eq!(context.blockchain.max_concurrent_requests(), 1);
    assert_eq!(context.blockchain.balance_requests().len(), 3);
    assert_eq!(manual_report.succeeded + manual_report.failed, 3);
    let pending = context.snapshots.get_pending().unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn concurrent_manual_runs_process_each_snapshot_once() {
    let context = TestContext::new(manual());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    context.blockchain.set_latency(Duration::from_millis(20));
    let project_id = context.create_project().unwrap();
    context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();

    let (first, second) = tokio::join!(
        context.queue().process_snapshots(),
        context.queue().process_snapshots()
    );

    let total = first.unwrap().succeeded + second.unwrap().succeeded;
    assert_eq!(total, 1);
    assert_eq!(context.blockchain.max_concurrent_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn stopped_service_does_not_process_anymore() {
    let context = TestContext::new(Config::default());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    let project_id = context.create_project().unwrap();
    context.service.start_and_await().await.unwrap();

    let state = context.service.stop_and_await().await.unwrap();
    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(state, State::Stopped);
    assert_eq!(status(&context, id), AssetSnapshotStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_the_running_tick_to_finish() {
    // Given
    let context = TestContext::new(Config::default());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    context.blockchain.set_latency(Duration::from_secs(30));
    let project_id = context.create_project().unwrap();
    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();
    context.service.start_and_await().await.unwrap();
    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(context.blockchain.balance_requests().len(), 1);
    assert_eq!(status(&context, id), AssetSnapshotStatus::Pending);

    // When
    let state = context.service.stop_and_await().await.unwrap();

    // Then
    assert_eq!(state, State::Stopped);
    assert_eq!(status(&context, id), AssetSnapshotStatus::Success);
    assert_eq!(context.ipfs.pinned_count(), 1);
}

#[tokio::test]
async fn listing_filters_by_status_and_project() {
    // Given
    let context = TestContext::new(manual());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5)]);
    let project_id = context.create_project().unwrap();
    let other_project_id = context.create_project().unwrap();
    let succeeded = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();
    context.queue().process_snapshots().await.unwrap();
    let pending = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 200))
        .unwrap();
    context
        .queue()
        .submit_asset_snapshot(snapshot_params(other_project_id, 300))
        .unwrap();

    // When
    let ids = |statuses: HashSet<AssetSnapshotStatus>| -> Vec<AssetSnapshotId> {
        context
            .queue()
            .get_all_asset_snapshots_by_project_id_and_statuses(project_id, &statuses)
            .unwrap()
            .into_iter()
            .map(|snapshot| snapshot.id)
            .collect()
    };

    // Then
    assert_eq!(ids(HashSet::new()), vec![succeeded, pending]);
    assert_eq!(
        ids([AssetSnapshotStatus::Success].into_iter().collect()),
        vec![succeeded]
    );
    assert_eq!(
        ids([AssetSnapshotStatus::Failed].into_iter().collect()),
        Vec::<AssetSnapshotId>::new()
    );
}

#[tokio::test]
async fn response_of_successful_snapshot_serializes_flat() {
    let context = TestContext::new(manual());
    context.blockchain.set_holders(asset(), vec![balance(0x1, 5), balance(0x2, 7)]);
    let project_id = context.create_project().unwrap();
    let id = context
        .queue()
        .submit_asset_snapshot(snapshot_params(project_id, 100))
        .unwrap();
    context.queue().process_snapshots().await.unwrap();

    let snapshot = context.queue().get_asset_snapshot_by_id(id).unwrap().unwrap();
    let json = serde_json::to_value(snapshot.to_response()).unwrap();

    assert_eq!(json["status"], "SUCCESS");
    assert_eq!(json["failure_cause"], serde_json::Value::Null);
    assert_eq!(json["total_asset_amount"], "12");
    assert_eq!(json["asset_snapshot_merkle_depth"], 1);
    assert_eq!(json["asset_snapshot_block_number"], 100);
    assert_eq!(json["asset_snapshot_merkle_ipfs_hash"], "QmFake0000");
}
