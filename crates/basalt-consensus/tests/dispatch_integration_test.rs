use basalt_consensus::adapters::{
    InMemoryBlockStore, InMemoryChainSource, InMemoryConsensusSink, InMemoryMempoolSource,
    NoopGossipSink, NoopPeerRouting,
};
use basalt_consensus::{DispatchOutcome, Dispatcher};
use basalt_types::{MessageTag, WireMessage};
use std::sync::Arc;

fn dispatcher() -> (
    Dispatcher,
    Arc<InMemoryConsensusSink>,
    Arc<InMemoryMempoolSource>,
    Arc<InMemoryBlockStore>,
    Arc<InMemoryChainSource>,
) {
    let consensus = Arc::new(InMemoryConsensusSink::new());
    let mempool = Arc::new(InMemoryMempoolSource::new());
    let blocks = Arc::new(InMemoryBlockStore::new());
    let chain = Arc::new(InMemoryChainSource::new());
    let gossip = Arc::new(NoopGossipSink);
    let peers = Arc::new(NoopPeerRouting);

    let dispatcher = Dispatcher::new(
        consensus.clone(),
        mempool.clone(),
        blocks.clone(),
        chain.clone(),
        gossip,
        peers,
    );
    (dispatcher, consensus, mempool, blocks, chain)
}

fn frame(tag: MessageTag, body: Vec<u8>) -> WireMessage {
    WireMessage::new(tag, [1u8; 32], 0, body)
}

#[test]
fn ping_replies_with_pong_echoing_body() {
    let (dispatcher, ..) = dispatcher();
    let msg = frame(MessageTag::Ping, vec![9, 9, 9]);
    let outcome = dispatcher.dispatch(&msg, [2u8; 32]).unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Reply(MessageTag::Pong, vec![9, 9, 9])
    );
}

#[test]
fn hello_after_handshake_is_rejected() {
    let (dispatcher, ..) = dispatcher();
    let msg = frame(MessageTag::Hello, vec![]);
    assert!(dispatcher.dispatch(&msg, [2u8; 32]).is_err());
}

#[test]
fn tx_announce_requests_missing_transactions() {
    use basalt_consensus::messages::HashListBody;
    let (dispatcher, _, mempool, ..) = dispatcher();
    let known = [1u8; 32];
    mempool.admit(known, vec![0xAA]);

    let unknown = [2u8; 32];
    let body = HashListBody {
        ids: vec![known, unknown],
    }
    .encode();
    let msg = frame(MessageTag::TxAnnounce, body);
    let outcome = dispatcher.dispatch(&msg, [3u8; 32]).unwrap();

    match outcome {
        DispatchOutcome::Reply(MessageTag::TxRequest, reply_body) => {
            let decoded = HashListBody::decode(&reply_body).unwrap();
            assert_eq!(decoded.ids, vec![unknown]);
        }
        other => panic!("expected TxRequest reply, got {other:?}"),
    }
}

#[test]
fn tx_payload_admits_and_regossips() {
    use basalt_consensus::messages::TxPayloadBody;
    let (dispatcher, _, mempool, ..) = dispatcher();
    let tx = vec![1, 2, 3, 4];
    let body = TxPayloadBody { txs: vec![tx.clone()] }.encode();
    let msg = frame(MessageTag::TxPayload, body);
    let outcome = dispatcher.dispatch(&msg, [3u8; 32]).unwrap();

    let tx_hash = *blake3::hash(&tx).as_bytes();
    assert!(mempool.has_tx(tx_hash));
    assert!(matches!(
        outcome,
        DispatchOutcome::GossipStandard(MessageTag::TxPayload, _)
    ));
}

#[test]
fn block_request_caps_at_max_sync_batch() {
    use basalt_consensus::messages::{BlockBatchBody, RangeRequestBody};
    let (dispatcher, .., blocks, _) = dispatcher();
    for i in 0..100u8 {
        blocks.push([i; 32], vec![i]);
    }
    let body = RangeRequestBody {
        from_height: 0,
        count: 500,
    }
    .encode();
    let msg = frame(MessageTag::BlockRequest, body);
    let outcome = dispatcher.dispatch(&msg, [3u8; 32]).unwrap();
    match outcome {
        DispatchOutcome::Reply(MessageTag::BlockPayload, reply_body) => {
            let batch = BlockBatchBody::decode(&reply_body).unwrap();
            assert_eq!(batch.blocks.len(), basalt_consensus::MAX_SYNC_BATCH);
        }
        other => panic!("expected BlockPayload reply, got {other:?}"),
    }
}

#[test]
fn sync_request_over_cap_is_rejected() {
    use basalt_consensus::messages::RangeRequestBody;
    let (dispatcher, ..) = dispatcher();
    let body = RangeRequestBody {
        from_height: 0,
        count: (basalt_consensus::MAX_SYNC_BATCH as u64) + 1,
    }
    .encode();
    let msg = frame(MessageTag::SyncRequest, body);
    assert!(dispatcher.dispatch(&msg, [3u8; 32]).is_err());
}

#[test]
fn conflicting_proposals_raise_double_sign_error() {
    use basalt_consensus::messages::ProposalBody;
    let (dispatcher, consensus, ..) = dispatcher();
    let proposer = [7u8; 32];

    let first = ProposalBody {
        view: 1,
        proposer,
        block_hash: [1u8; 32],
        payload: vec![],
    }
    .encode();
    dispatcher
        .dispatch(&frame(MessageTag::ConsensusProposal, first), [9u8; 32])
        .unwrap();

    let second = ProposalBody {
        view: 1,
        proposer,
        block_hash: [2u8; 32],
        payload: vec![],
    }
    .encode();
    let result = dispatcher.dispatch(&frame(MessageTag::ConsensusProposal, second), [9u8; 32]);
    assert!(result.is_err());
    assert_eq!(consensus.proposals.lock().unwrap().len(), 2);
}

#[test]
fn block_payload_gap_triggers_resync() {
    use basalt_consensus::messages::BlockBatchBody;
    let consensus = Arc::new(InMemoryConsensusSink::new());
    let mempool = Arc::new(InMemoryMempoolSource::new());
    let blocks = Arc::new(InMemoryBlockStore::new());

    struct GappyChain;
    impl basalt_consensus::ports::ChainSource for GappyChain {
        fn apply_block(&self, _body: Vec<u8>) -> bool {
            true
        }
        fn apply_sync_batch(&self, _bodies: Vec<Vec<u8>>) {}
    }

    let dispatcher = Dispatcher::new(
        consensus,
        mempool,
        blocks,
        Arc::new(GappyChain),
        Arc::new(NoopGossipSink),
        Arc::new(NoopPeerRouting),
    );

    let body = BlockBatchBody {
        blocks: vec![vec![1, 2, 3]],
    }
    .encode();
    let outcome = dispatcher
        .dispatch(&frame(MessageTag::BlockPayload, body), [3u8; 32])
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::TriggerResync);
}
