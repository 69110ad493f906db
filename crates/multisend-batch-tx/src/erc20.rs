//! ERC-20 call encoding for the four functions the engine needs.

use ethers::{
    abi::{self, ParamType, Token},
    types::{Address, Bytes, U256},
    utils::id,
};

pub const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";
pub const DECIMALS_SIGNATURE: &str = "decimals()";
pub const SYMBOL_SIGNATURE: &str = "symbol()";

fn with_selector(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    data.into()
}

pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    with_selector(TRANSFER_SIGNATURE, &[Token::Address(to), Token::Uint(amount)])
}

pub fn encode_balance_of(owner: Address) -> Bytes {
    with_selector(BALANCE_OF_SIGNATURE, &[Token::Address(owner)])
}

pub fn encode_decimals() -> Bytes {
    with_selector(DECIMALS_SIGNATURE, &[])
}

pub fn encode_symbol() -> Bytes {
    with_selector(SYMBOL_SIGNATURE, &[])
}

/// Split calldata into its selector and argument bytes
pub fn split_selector(data: &[u8]) -> Option<([u8; 4], &[u8])> {
    if data.len() < 4 {
        return None;
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&data[..4]);
    Some((selector, &data[4..]))
}

/// Decode the arguments of a `transfer(address,uint256)` call
pub fn decode_transfer(data: &[u8]) -> Option<(Address, U256)> {
    let (selector, args) = split_selector(data)?;
    if selector != id(TRANSFER_SIGNATURE) {
        return None;
    }
    let mut tokens = abi::decode(&[ParamType::Address, ParamType::Uint(256)], args)
        .ok()?
        .into_iter();
    let to = tokens.next()?.into_address()?;
    let amount = tokens.next()?.into_uint()?;
    Some((to, amount))
}

pub fn decode_uint(data: &[u8]) -> Result<U256, String> {
    abi::decode(&[ParamType::Uint(256)], data)
        .map_err(|e| e.to_string())?
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| "expected a uint256 return value".to_string())
}

pub fn decode_string(data: &[u8]) -> Result<String, String> {
    abi::decode(&[ParamType::String], data)
        .map_err(|e| e.to_string())?
        .into_iter()
        .next()
        .and_then(Token::into_string)
        .ok_or_else(|| "expected a string return value".to_string())
}
