//! Solana primitives for the wallet demo.
//!
//! Addresses, Ed25519 keypairs and the legacy transaction wire format,
//! built by hand on `ed25519-dalek` and `bs58` instead of `solana-sdk`.

pub mod address;
pub mod error;
pub mod keypair;
pub mod transaction;

pub use address::Pubkey;
pub use error::SolError;
pub use keypair::{Keypair, Signature};
pub use transaction::{
    build_transfer, decode_compact_u16, encode_compact_u16, transfer_instruction, AccountMeta,
    Blockhash, CompiledInstruction, Instruction, Message, SystemTransfer, Transaction,
    SYSTEM_PROGRAM_ID,
};

/// Lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
