//! # Consensus Message Dispatcher
//!
//! Thin router between decoded wire frames (§4.1/§6) and the external
//! collaborators that actually interpret them. See the module-level doc on
//! each port in `ports.rs` for what is and isn't this crate's job.

use crate::double_sign::DoubleSignDetector;
use crate::error::DispatchError;
use crate::messages::*;
use crate::ports::{BlockStore, ChainSource, ConsensusSink, GossipSink, MempoolSource, PeerRouting};
use basalt_types::{MessageTag, WireMessage};
use std::sync::Arc;
use tracing::warn;

/// Maximum blocks served per `BlockRequest`/`SyncRequest`.
pub const MAX_SYNC_BATCH: usize = 50;

/// Maximum closest peers returned per `FindNode`.
pub const KADEMLIA_K: usize = 20;

/// Outcome of dispatching one frame: either nothing further to send, or a
/// reply frame the transport layer should send back to the peer that sent
/// the original message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No reply is warranted.
    NoReply,
    /// Send this frame back to the peer that sent the dispatched message.
    Reply(MessageTag, Vec<u8>),
    /// Re-broadcast this frame to the gossip standard tier, excluding the
    /// original sender.
    GossipStandard(MessageTag, Vec<u8>),
    /// State re-sync should be triggered; an ancestor block is missing.
    TriggerResync,
}

/// Routes inbound wire frames to the appropriate collaborator.
pub struct Dispatcher {
    consensus: Arc<dyn ConsensusSink>,
    mempool: Arc<dyn MempoolSource>,
    blocks: Arc<dyn BlockStore>,
    chain: Arc<dyn ChainSource>,
    gossip: Arc<dyn GossipSink>,
    peers: Arc<dyn PeerRouting>,
    double_sign: DoubleSignDetector,
}

impl Dispatcher {
    pub fn new(
        consensus: Arc<dyn ConsensusSink>,
        mempool: Arc<dyn MempoolSource>,
        blocks: Arc<dyn BlockStore>,
        chain: Arc<dyn ChainSource>,
        gossip: Arc<dyn GossipSink>,
        peers: Arc<dyn PeerRouting>,
    ) -> Self {
        Self {
            consensus,
            mempool,
            blocks,
            chain,
            gossip,
            peers,
            double_sign: DoubleSignDetector::new(),
        }
    }

    /// Dispatch one decoded frame. `from` is the sending peer's id.
    pub fn dispatch(
        &self,
        msg: &WireMessage,
        from: [u8; 32],
    ) -> Result<DispatchOutcome, DispatchError> {
        match msg.tag {
            MessageTag::Hello | MessageTag::HelloAck => {
                Err(DispatchError::HandshakeAlreadyComplete)
            }

            MessageTag::Ping => Ok(DispatchOutcome::Reply(MessageTag::Pong, msg.body.clone())),
            MessageTag::Pong => Ok(DispatchOutcome::NoReply),

            MessageTag::TxAnnounce => {
                let announced = HashListBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                let missing: Vec<_> = announced
                    .ids
                    .into_iter()
                    .filter(|id| !self.mempool.has_tx(*id))
                    .collect();
                if missing.is_empty() {
                    Ok(DispatchOutcome::NoReply)
                } else {
                    let body = HashListBody { ids: missing }.encode();
                    Ok(DispatchOutcome::Reply(MessageTag::TxRequest, body))
                }
            }

            MessageTag::TxRequest => {
                let wanted = HashListBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                let found = self.mempool.get_txs(&wanted.ids);
                let body = TxPayloadBody {
                    txs: found.into_iter().map(|(_, body)| body).collect(),
                }
                .encode();
                Ok(DispatchOutcome::Reply(MessageTag::TxPayload, body))
            }

            MessageTag::TxPayload => {
                let payload = TxPayloadBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                for tx in payload.txs {
                    let tx_hash = *blake3::hash(&tx).as_bytes();
                    self.mempool.admit(tx_hash, tx);
                }
                Ok(DispatchOutcome::GossipStandard(msg.tag, msg.body.clone()))
            }

            MessageTag::BlockAnnounce => {
                let announce = BlockAnnounceBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                if self.blocks.has_block(announce.block_hash) {
                    Ok(DispatchOutcome::NoReply)
                } else {
                    let body = RangeRequestBody {
                        from_height: announce.height,
                        count: 1,
                    }
                    .encode();
                    Ok(DispatchOutcome::Reply(MessageTag::BlockRequest, body))
                }
            }

            MessageTag::BlockRequest => {
                let range = RangeRequestBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                let count = (range.count as usize).min(MAX_SYNC_BATCH);
                let found = self.blocks.get_range(range.from_height, count);
                let body = BlockBatchBody { blocks: found }.encode();
                Ok(DispatchOutcome::Reply(MessageTag::BlockPayload, body))
            }

            MessageTag::BlockPayload => {
                let batch = BlockBatchBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                let mut gap_detected = false;
                for block in batch.blocks {
                    if self.chain.apply_block(block) {
                        gap_detected = true;
                    }
                }
                if gap_detected {
                    Ok(DispatchOutcome::TriggerResync)
                } else {
                    Ok(DispatchOutcome::NoReply)
                }
            }

            MessageTag::ConsensusProposal => {
                let proposal = ProposalBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                if let Some(evidence) =
                    self.double_sign
                        .record(proposal.view, proposal.proposer, proposal.block_hash)
                {
                    warn!(
                        view = evidence.view,
                        proposer = ?evidence.proposer,
                        "double-sign evidence recorded"
                    );
                    self.consensus.submit_proposal(
                        proposal.view,
                        proposal.proposer,
                        proposal.block_hash,
                        proposal.payload,
                    );
                    return Err(DispatchError::DoubleSignDetected {
                        view: evidence.view,
                        proposer: evidence.proposer,
                    });
                }
                self.consensus.submit_proposal(
                    proposal.view,
                    proposal.proposer,
                    proposal.block_hash,
                    proposal.payload,
                );
                Ok(DispatchOutcome::NoReply)
            }

            MessageTag::ConsensusVote => {
                let vote = VoteBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                self.consensus
                    .submit_vote(vote.view, vote.voter, vote.block_hash, vote.payload);
                Ok(DispatchOutcome::NoReply)
            }

            MessageTag::ConsensusViewChange => {
                let view_change = ViewChangeBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                self.consensus.submit_view_change(
                    view_change.new_view,
                    view_change.validator,
                    view_change.payload,
                );
                Ok(DispatchOutcome::NoReply)
            }

            MessageTag::ConsensusAggregateVote => {
                let aggregate = AggregateVoteBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                self.consensus.submit_aggregate_vote(
                    aggregate.view,
                    aggregate.block_hash,
                    aggregate.payload,
                );
                Ok(DispatchOutcome::NoReply)
            }

            MessageTag::SyncRequest => {
                let range = RangeRequestBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                let requested = range.count as usize;
                if requested > MAX_SYNC_BATCH {
                    return Err(DispatchError::RangeTooLarge {
                        requested,
                        max: MAX_SYNC_BATCH,
                    });
                }
                let found = self.blocks.get_range(range.from_height, requested);
                let body = BlockBatchBody { blocks: found }.encode();
                Ok(DispatchOutcome::Reply(MessageTag::SyncResponse, body))
            }

            MessageTag::SyncResponse => {
                let batch = BlockBatchBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                self.chain.apply_sync_batch(batch.blocks);
                Ok(DispatchOutcome::NoReply)
            }

            MessageTag::IHave => {
                let ids = HashListBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                self.gossip.handle_ihave(from, ids.ids);
                Ok(DispatchOutcome::NoReply)
            }

            MessageTag::IWant => {
                let ids = HashListBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                self.gossip.handle_iwant(from, ids.ids);
                Ok(DispatchOutcome::NoReply)
            }

            MessageTag::Graft => {
                self.gossip.handle_graft(from);
                Ok(DispatchOutcome::NoReply)
            }

            MessageTag::Prune => {
                self.gossip.handle_prune(from);
                Ok(DispatchOutcome::NoReply)
            }

            MessageTag::FindNode => {
                let request = FindNodeBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                let mut peers = self.peers.closest_peers(request.target);
                peers.truncate(KADEMLIA_K);
                let body = FindNodeResponseBody { peers }.encode();
                Ok(DispatchOutcome::Reply(MessageTag::FindNodeResponse, body))
            }

            MessageTag::FindNodeResponse => {
                FindNodeResponseBody::decode(&msg.body)
                    .map_err(|_| DispatchError::MalformedBody(msg.tag))?;
                Ok(DispatchOutcome::NoReply)
            }
        }
    }
}
