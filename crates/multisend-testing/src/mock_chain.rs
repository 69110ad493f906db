use {
    ethers::{
        abi::{self, Token},
        types::{
            transaction::eip2718::TypedTransaction, Address, Bytes, NameOrAddress, H256, U256,
        },
        utils::{id, keccak256, rlp::Rlp},
    },
    multisend_batch_tx::{erc20, RpcError, RpcResult, NATIVE_TRANSFER_GAS_LIMIT},
    std::{
        collections::{HashMap, VecDeque},
        sync::{Arc, Mutex, MutexGuard},
    },
};

/// What the chain does with the next broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastBehavior {
    /// Validate and apply the transaction like a node would
    Accept,
    /// Answer with a JSON-RPC error without looking at the transaction
    Reject { code: i64, message: String },
    /// Another transaction takes the sender's nonce first
    NonceRace,
    /// The endpoint cannot be reached
    Transport(String),
    /// Apply the transaction, then lose the reply at the transport level
    DropReplyAfterAccept(String),
    /// Apply the transaction, then never answer
    HangAfterAccept,
    /// Never answer and drop the transaction
    HangWithoutAccept,
}

impl BroadcastBehavior {
    pub fn reject(message: &str) -> Self {
        BroadcastBehavior::Reject {
            code: -32000,
            message: message.to_string(),
        }
    }
}

/// A transaction the chain accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransaction {
    pub hash: H256,
    pub from: Address,
    /// Recipient of the value or of the token transfer
    pub to: Address,
    pub nonce: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub value: U256,
    /// Token contract and amount for ERC-20 transfers
    pub token_transfer: Option<(Address, U256)>,
}

/// Every broadcast the chain saw, accepted or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRecord {
    pub hash: H256,
    pub from: Address,
    pub nonce: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
}

#[derive(Debug, Default)]
struct TokenState {
    symbol: String,
    decimals: u8,
    balances: HashMap<Address, U256>,
}

#[derive(Debug, Default)]
struct ChainState {
    chain_id: u64,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, U256>,
    tokens: HashMap<Address, TokenState>,
    gas_price: Option<U256>,
    min_gas_price: U256,
    token_gas_estimate: Option<U256>,
    /// Balance reads still served before they start failing
    balance_reads_left: Option<usize>,
    script: VecDeque<BroadcastBehavior>,
    sent: Vec<SentTransaction>,
    broadcasts: Vec<BroadcastRecord>,
}

/// Outcome of processing one broadcast while holding the state lock
enum Processed {
    Answer(RpcResult<H256>),
    Hang,
}

/// Scriptable in-memory chain shared by every `MockEndpoint` built on it
#[derive(Debug, Clone)]
pub struct MockChain {
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        let state = ChainState {
            chain_id,
            gas_price: Some(U256::one()),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().expect("mock chain state poisoned")
    }

    pub fn chain_id(&self) -> u64 {
        self.state().chain_id
    }

    pub fn fund(&self, address: Address, amount: U256) {
        self.state().balances.insert(address, amount);
    }

    pub fn set_nonce(&self, address: Address, nonce: U256) {
        self.state().nonces.insert(address, nonce);
    }

    /// Live gas price quote; `None` makes quote reads fail
    pub fn set_gas_price(&self, gas_price: Option<U256>) {
        self.state().gas_price = gas_price;
    }

    /// Broadcasts priced below this are rejected as underpriced
    pub fn set_min_gas_price(&self, min_gas_price: U256) {
        self.state().min_gas_price = min_gas_price;
    }

    /// Gas estimate for token transfers; `None` makes estimation fail
    pub fn set_token_gas_estimate(&self, estimate: Option<U256>) {
        self.state().token_gas_estimate = estimate;
    }

    /// Serve `reads` more balance reads, then fail every one; `None` lifts the limit
    pub fn limit_balance_reads(&self, reads: Option<usize>) {
        self.state().balance_reads_left = reads;
    }

    /// Balance as an endpoint reports it, subject to the read limit
    pub fn read_balance(&self, address: Address) -> RpcResult<U256> {
        let mut state = self.state();
        match state.balance_reads_left.as_mut() {
            Some(0) => return Err(RpcError::Transport("balance read refused".to_string())),
            Some(left) => *left -= 1,
            None => {}
        }
        Ok(state.balances.get(&address).copied().unwrap_or_default())
    }

    pub fn deploy_token(&self, contract: Address, symbol: &str, decimals: u8) {
        self.state().tokens.insert(
            contract,
            TokenState {
                symbol: symbol.to_string(),
                decimals,
                balances: HashMap::new(),
            },
        );
    }

    pub fn mint(&self, contract: Address, owner: Address, amount: U256) {
        let mut state = self.state();
        let token = state.tokens.entry(contract).or_default();
        token.balances.insert(owner, amount);
    }

    /// Queue behaviors for the next broadcasts; once drained every broadcast is accepted
    pub fn script<I>(&self, behaviors: I)
    where
        I: IntoIterator<Item = BroadcastBehavior>,
    {
        self.state().script.extend(behaviors);
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.state()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    pub fn token_balance(&self, contract: Address, owner: Address) -> U256 {
        self.state()
            .tokens
            .get(&contract)
            .and_then(|token| token.balances.get(&owner).copied())
            .unwrap_or_default()
    }

    pub fn nonce(&self, address: Address) -> U256 {
        self.state()
            .nonces
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.state().sent.clone()
    }

    pub fn broadcasts(&self) -> Vec<BroadcastRecord> {
        self.state().broadcasts.clone()
    }

    pub fn get_gas_price(&self) -> RpcResult<U256> {
        self.state()
            .gas_price
            .ok_or_else(|| RpcError::Transport("gas price unavailable".to_string()))
    }

    pub fn estimate_gas(&self, tx: &TypedTransaction) -> RpcResult<U256> {
        let data = tx.data().map(|d| d.to_vec()).unwrap_or_default();
        if data.is_empty() {
            return Ok(U256::from(NATIVE_TRANSFER_GAS_LIMIT));
        }
        self.state().token_gas_estimate.ok_or_else(|| RpcError::Rejected {
            code: 3,
            message: "execution reverted".to_string(),
        })
    }

    /// Answer ERC-20 view calls
    pub fn call(&self, tx: &TypedTransaction) -> RpcResult<Bytes> {
        let contract = match tx.to() {
            Some(NameOrAddress::Address(address)) => *address,
            _ => return Err(reverted()),
        };
        let data = tx.data().cloned().unwrap_or_default();
        let (selector, args) = erc20::split_selector(&data).ok_or_else(reverted)?;

        let state = self.state();
        let token = state.tokens.get(&contract).ok_or_else(reverted)?;

        let output = if selector == id(erc20::BALANCE_OF_SIGNATURE) {
            let owner = abi::decode(&[abi::ParamType::Address], args)
                .ok()
                .and_then(|tokens| tokens.into_iter().next())
                .and_then(Token::into_address)
                .ok_or_else(reverted)?;
            let balance = token.balances.get(&owner).copied().unwrap_or_default();
            abi::encode(&[Token::Uint(balance)])
        } else if selector == id(erc20::DECIMALS_SIGNATURE) {
            abi::encode(&[Token::Uint(U256::from(token.decimals))])
        } else if selector == id(erc20::SYMBOL_SIGNATURE) {
            abi::encode(&[Token::String(token.symbol.clone())])
        } else {
            return Err(reverted());
        };

        Ok(output.into())
    }

    /// Process a signed transaction according to the script
    pub async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<H256> {
        match self.process(&raw) {
            Processed::Answer(result) => result,
            Processed::Hang => std::future::pending().await,
        }
    }

    fn process(&self, raw: &Bytes) -> Processed {
        let decoded = match decode_raw(raw) {
            Ok(decoded) => decoded,
            Err(e) => return Processed::Answer(Err(e)),
        };

        let mut state = self.state();
        state.broadcasts.push(BroadcastRecord {
            hash: decoded.hash,
            from: decoded.from,
            nonce: decoded.nonce,
            gas_price: decoded.gas_price,
            gas_limit: decoded.gas_limit,
        });

        let behavior = state
            .script
            .pop_front()
            .unwrap_or(BroadcastBehavior::Accept);

        match behavior {
            BroadcastBehavior::Accept => Processed::Answer(state.apply(decoded)),
            BroadcastBehavior::Reject { code, message } => {
                Processed::Answer(Err(RpcError::Rejected { code, message }))
            }
            BroadcastBehavior::NonceRace => {
                let nonce = state.nonces.entry(decoded.from).or_default();
                *nonce = (*nonce).max(decoded.nonce) + U256::one();
                Processed::Answer(Err(RpcError::Rejected {
                    code: -32000,
                    message: "nonce too low".to_string(),
                }))
            }
            BroadcastBehavior::Transport(message) => {
                Processed::Answer(Err(RpcError::Transport(message)))
            }
            BroadcastBehavior::DropReplyAfterAccept(message) => {
                let _ = state.apply(decoded);
                Processed::Answer(Err(RpcError::Transport(message)))
            }
            BroadcastBehavior::HangAfterAccept => {
                // The answer is lost, the transaction is not
                let _ = state.apply(decoded);
                Processed::Hang
            }
            BroadcastBehavior::HangWithoutAccept => Processed::Hang,
        }
    }
}

impl ChainState {
    fn apply(&mut self, tx: DecodedTransaction) -> RpcResult<H256> {
        if self.sent.iter().any(|sent| sent.hash == tx.hash) {
            return Err(rejected("already known"));
        }
        if tx.chain_id != self.chain_id {
            return Err(rejected("invalid chain id for signer"));
        }

        let expected_nonce = self.nonces.get(&tx.from).copied().unwrap_or_default();
        if tx.nonce < expected_nonce {
            return Err(rejected("nonce too low"));
        }
        if tx.gas_price < self.min_gas_price {
            return Err(rejected("transaction underpriced"));
        }
        if tx.gas_limit < U256::from(NATIVE_TRANSFER_GAS_LIMIT) {
            return Err(rejected("intrinsic gas too low"));
        }

        let fee = tx.gas_price.saturating_mul(tx.gas_limit);
        let balance = self.balances.get(&tx.from).copied().unwrap_or_default();
        if balance < fee.saturating_add(tx.value) {
            return Err(rejected("insufficient funds for gas * price + value"));
        }

        let (to, token_transfer) = match erc20::decode_transfer(&tx.data) {
            Some((recipient, amount)) => {
                let token = self.tokens.get_mut(&tx.to).ok_or_else(reverted)?;
                let held = token.balances.get(&tx.from).copied().unwrap_or_default();
                if held < amount {
                    return Err(RpcError::Rejected {
                        code: 3,
                        message: "execution reverted: transfer amount exceeds balance".to_string(),
                    });
                }
                token.balances.insert(tx.from, held - amount);
                *token.balances.entry(recipient).or_default() += amount;
                (recipient, Some((tx.to, amount)))
            }
            None => (tx.to, None),
        };

        self.balances.insert(tx.from, balance - fee - tx.value);
        *self.balances.entry(tx.to).or_default() += tx.value;
        self.nonces.insert(tx.from, tx.nonce + U256::one());

        self.sent.push(SentTransaction {
            hash: tx.hash,
            from: tx.from,
            to,
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            value: tx.value,
            token_transfer,
        });

        Ok(tx.hash)
    }
}

struct DecodedTransaction {
    hash: H256,
    from: Address,
    to: Address,
    chain_id: u64,
    nonce: U256,
    gas_price: U256,
    gas_limit: U256,
    value: U256,
    data: Bytes,
}

fn decode_raw(raw: &Bytes) -> RpcResult<DecodedTransaction> {
    let rlp = Rlp::new(raw.as_ref());
    let (mut tx, signature) = TypedTransaction::decode_signed(&rlp)
        .map_err(|e| RpcError::Rejected {
            code: -32602,
            message: format!("rlp: {}", e),
        })?;
    // EIP-155: v = chain_id * 2 + 35 + parity
    let chain_id = match tx.chain_id() {
        Some(chain_id) => chain_id.as_u64(),
        None if signature.v >= 35 => (signature.v - 35) / 2,
        None => return Err(rejected("only replay-protected transactions are supported")),
    };
    tx.set_chain_id(chain_id);

    let from = signature
        .recover(tx.sighash())
        .map_err(|e| rejected(&format!("invalid sender: {}", e)))?;
    let to = match tx.to() {
        Some(NameOrAddress::Address(address)) => *address,
        _ => return Err(rejected("contract creation not supported")),
    };

    Ok(DecodedTransaction {
        hash: H256::from(keccak256(raw.as_ref())),
        from,
        to,
        chain_id,
        nonce: tx.nonce().copied().unwrap_or_default(),
        gas_price: tx.gas_price().unwrap_or_default(),
        gas_limit: tx.gas().copied().unwrap_or_default(),
        value: tx.value().copied().unwrap_or_default(),
        data: tx.data().cloned().unwrap_or_default(),
    })
}

fn rejected(message: &str) -> RpcError {
    RpcError::Rejected {
        code: -32000,
        message: message.to_string(),
    }
}

fn reverted() -> RpcError {
    RpcError::Rejected {
        code: 3,
        message: "execution reverted".to_string(),
    }
}
