//! Integration tests for node bootstrap: config, genesis, and the
//! consensus dispatcher the container wires together.

use basalt_consensus::DispatchOutcome;
use basalt_node::container::{NodeConfig, SubsystemContainer};
use basalt_types::{MessageTag, WireMessage};

#[test]
fn standalone_node_boots_with_empty_genesis() {
    let config = NodeConfig::default();
    let container = SubsystemContainer::new(config).unwrap();

    assert_eq!(container.genesis.header.height, 0);
    assert_eq!(container.genesis.header.parent_hash, [0u8; 32]);
    assert!(container.genesis.validators.is_empty());
}

#[test]
fn validator_node_seeds_genesis_with_its_own_stake() {
    let mut config = NodeConfig::default();
    config.validator_index = Some(0);
    config.validator_key = [3u8; 32];
    config.peers = vec!["127.0.0.1:30303".to_string()];

    let container = SubsystemContainer::new(config).unwrap();
    assert_eq!(container.genesis.validators.len(), 1);
    assert_eq!(container.genesis.validators[0].pubkey, [3u8; 32]);
}

#[test]
fn dispatcher_from_the_container_answers_ping() {
    let container = SubsystemContainer::new(NodeConfig::default()).unwrap();
    let msg = WireMessage::new(MessageTag::Ping, [1u8; 32], 0, vec![5, 5]);
    let outcome = container.dispatcher.dispatch(&msg, [2u8; 32]).unwrap();
    assert_eq!(outcome, DispatchOutcome::Reply(MessageTag::Pong, vec![5, 5]));
}
