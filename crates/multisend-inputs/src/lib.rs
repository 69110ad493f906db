/*!
# Multisend Inputs

Loading and validation of everything a batch needs from the operator's working directory.

## Files

- **`rpc.json`** - array of networks: `name`, `chainId`, endpoints (`rpcUrls`, `rpcUrl` or
  `endpoint`), `explorer`, and optional `symbol`, `decimals`, `minGasPriceGwei`,
  `baseGasPriceGwei`
- **`pk.txt`** - one private key per line
- **`address.txt`** - one destination address per line

## Usage

```rust,no_run
use multisend_inputs::{read_addresses, read_keys, read_networks, parse_amount};

let networks = read_networks("rpc.json")?;
let network = &networks[0];
let signers = read_keys("pk.txt", network.chain_id)?;
let destinations = read_addresses("address.txt")?;
let amount = parse_amount("0.25", network.native_decimals)?;
# Ok::<(), multisend_inputs::InputError>(())
```
*/

pub mod addresses;
pub mod amounts;
pub mod errors;
pub mod keys;
pub mod network;

pub use addresses::{parse_addresses, read_addresses};
pub use amounts::{format_amount, parse_amount};
pub use errors::{InputError, InputResult};
pub use keys::{parse_keys, read_keys};
pub use network::{find_network, parse_networks, read_networks, NetworkEntry};
