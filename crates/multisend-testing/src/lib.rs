/*!
# Multisend Testing

`MockChain` is a scriptable in-memory EVM account model: balances, pending nonces, ERC-20
balances and a queue of broadcast behaviors (accept, reject, nonce race, transport failure,
hang). `MockEndpoint` puts it behind the `ChainRpc` seam so the real pool, fee policy,
submitter, planner and executor run against it unchanged.
*/

mod fixtures;
mod mock_chain;
mod mock_endpoint;

pub use fixtures::*;
pub use mock_chain::{BroadcastBehavior, BroadcastRecord, MockChain, SentTransaction};
pub use mock_endpoint::MockEndpoint;
