//! Typed bodies for the tags the dispatcher must act on.
//!
//! Hello/HelloAck/Ping/Pong bodies are owned by the handshake/liveness code
//! in the transport layer; the dispatcher only checks their tag to reject
//! or route them, so no body type is defined here for those.

use basalt_types::{CodecError, Hash, Reader, Writer};

fn write_hash_list(w: &mut Writer, hashes: &[Hash]) {
    w.write_varint(hashes.len() as u64);
    for h in hashes {
        w.write_hash(h);
    }
}

fn read_hash_list(r: &mut Reader) -> Result<Vec<Hash>, CodecError> {
    let count = r.read_varint()? as usize;
    let mut out = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        out.push(r.read_hash()?);
    }
    Ok(out)
}

/// `TxAnnounce` / `IHave` / `IWant` all carry a list of content ids.
pub struct HashListBody {
    pub ids: Vec<Hash>,
}

impl HashListBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(8 + self.ids.len() * 32);
        write_hash_list(&mut w, &self.ids);
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        Ok(Self {
            ids: read_hash_list(&mut r)?,
        })
    }
}

/// `TxPayload`: one or more raw transactions, each length-prefixed.
pub struct TxPayloadBody {
    pub txs: Vec<Vec<u8>>,
}

impl TxPayloadBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(8 + self.txs.iter().map(|t| t.len() + 4).sum::<usize>());
        w.write_varint(self.txs.len() as u64);
        for tx in &self.txs {
            w.write_bytes(tx);
        }
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        let count = r.read_varint()? as usize;
        let mut txs = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            txs.push(r.read_bytes()?);
        }
        Ok(Self { txs })
    }
}

/// `BlockAnnounce`: advertises a block the sender has.
pub struct BlockAnnounceBody {
    pub height: u64,
    pub block_hash: Hash,
}

impl BlockAnnounceBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(40);
        w.write_u64(self.height);
        w.write_hash(&self.block_hash);
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        Ok(Self {
            height: r.read_u64()?,
            block_hash: r.read_hash()?,
        })
    }
}

/// `BlockRequest` / `SyncRequest`: a contiguous height range.
pub struct RangeRequestBody {
    pub from_height: u64,
    pub count: u64,
}

impl RangeRequestBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(16);
        w.write_u64(self.from_height);
        w.write_u64(self.count);
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        Ok(Self {
            from_height: r.read_u64()?,
            count: r.read_u64()?,
        })
    }
}

/// `BlockPayload` / `SyncResponse`: one or more raw block blobs.
pub struct BlockBatchBody {
    pub blocks: Vec<Vec<u8>>,
}

impl BlockBatchBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w =
            Writer::with_capacity(8 + self.blocks.iter().map(|b| b.len() + 4).sum::<usize>());
        w.write_varint(self.blocks.len() as u64);
        for block in &self.blocks {
            w.write_bytes(block);
        }
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        let count = r.read_varint()? as usize;
        let mut blocks = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            blocks.push(r.read_bytes()?);
        }
        Ok(Self { blocks })
    }
}

/// `ConsensusProposal`: a proposed block for a given view.
pub struct ProposalBody {
    pub view: u64,
    pub proposer: [u8; 32],
    pub block_hash: Hash,
    pub payload: Vec<u8>,
}

impl ProposalBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(8 + 32 + 32 + self.payload.len() + 4);
        w.write_u64(self.view);
        w.write_hash(&self.proposer);
        w.write_hash(&self.block_hash);
        w.write_bytes(&self.payload);
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        Ok(Self {
            view: r.read_u64()?,
            proposer: r.read_hash()?,
            block_hash: r.read_hash()?,
            payload: r.read_bytes()?,
        })
    }
}

/// `ConsensusVote`: a vote for a block at a given view.
pub struct VoteBody {
    pub view: u64,
    pub voter: [u8; 32],
    pub block_hash: Hash,
    pub payload: Vec<u8>,
}

impl VoteBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(8 + 32 + 32 + self.payload.len() + 4);
        w.write_u64(self.view);
        w.write_hash(&self.voter);
        w.write_hash(&self.block_hash);
        w.write_bytes(&self.payload);
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        Ok(Self {
            view: r.read_u64()?,
            voter: r.read_hash()?,
            block_hash: r.read_hash()?,
            payload: r.read_bytes()?,
        })
    }
}

/// `ConsensusViewChange`: a request to move to a new view.
pub struct ViewChangeBody {
    pub new_view: u64,
    pub validator: [u8; 32],
    pub payload: Vec<u8>,
}

impl ViewChangeBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(8 + 32 + self.payload.len() + 4);
        w.write_u64(self.new_view);
        w.write_hash(&self.validator);
        w.write_bytes(&self.payload);
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        Ok(Self {
            new_view: r.read_u64()?,
            validator: r.read_hash()?,
            payload: r.read_bytes()?,
        })
    }
}

/// `ConsensusAggregateVote`: a threshold-signed vote for a block at a view.
pub struct AggregateVoteBody {
    pub view: u64,
    pub block_hash: Hash,
    pub payload: Vec<u8>,
}

impl AggregateVoteBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(8 + 32 + self.payload.len() + 4);
        w.write_u64(self.view);
        w.write_hash(&self.block_hash);
        w.write_bytes(&self.payload);
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        Ok(Self {
            view: r.read_u64()?,
            block_hash: r.read_hash()?,
            payload: r.read_bytes()?,
        })
    }
}

/// `FindNode`: a Kademlia lookup request for the 20 closest peers to `target`.
pub struct FindNodeBody {
    pub target: [u8; 32],
}

impl FindNodeBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(32);
        w.write_hash(&self.target);
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        Ok(Self {
            target: r.read_hash()?,
        })
    }
}

/// `FindNodeResponse`: the closest peers to a previously requested target.
pub struct FindNodeResponseBody {
    pub peers: Vec<[u8; 32]>,
}

impl FindNodeResponseBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(8 + self.peers.len() * 32);
        write_hash_list(&mut w, &self.peers);
        w.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(body);
        Ok(Self {
            peers: read_hash_list(&mut r)?,
        })
    }
}
