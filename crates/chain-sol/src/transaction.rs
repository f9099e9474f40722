//! Solana legacy transaction wire format, signing and decoding.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use std::fmt;
use std::str::FromStr;

use crate::address::Pubkey;
use crate::error::SolError;
use crate::keypair::{Keypair, Signature};

/// The System Program: 32 zero bytes, `11111111111111111111111111111111`.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new([0u8; 32]);

/// System Program `Transfer` instruction index (little-endian u32).
const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

// ---------------------------------------------------------------------------
// Blockhash
// ---------------------------------------------------------------------------

/// A recent blockhash, Base58 encoded on the wire of the JSON-RPC API.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Blockhash([u8; 32]);

impl Blockhash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl FromStr for Blockhash {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SolError::SerializationError(format!("blockhash: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            SolError::SerializationError(format!("blockhash: expected 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` in Solana's compact-u16 format (1 to 3 bytes, 7 bits each).
pub fn encode_compact_u16(value: u16, out: &mut Vec<u8>) {
    let mut val = value as u32;
    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }
}

/// Decode a compact-u16 value, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    for (i, byte) in data.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return u16::try_from(value)
                .map(|v| (v, i + 1))
                .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()));
        }
    }
    Err(SolError::SerializationError(
        "unexpected end of data while decoding compact-u16".into(),
    ))
}

fn encode_len(len: usize, out: &mut Vec<u8>) -> Result<(), SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("length {len} exceeds u16")))?;
    encode_compact_u16(len, out);
    Ok(())
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// One account reference of an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// An instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// System Program `Transfer`: move `lamports` from `from` (signer) to `to`.
pub fn transfer_instruction(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    // u32 LE instruction index + u64 LE lamports.
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta {
                pubkey: *from,
                is_signer: true,
                is_writable: true,
            },
            AccountMeta {
                pubkey: *to,
                is_signer: false,
                is_writable: true,
            },
        ],
        data,
    }
}

/// An instruction whose account references are indices into the message keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A decoded System Program transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemTransfer {
    pub from: Pubkey,
    pub to: Pubkey,
    pub lamports: u64,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    /// Canonical order: writable signers (fee payer first), read-only
    /// signers, writable non-signers, read-only non-signers.
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Blockhash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compile `instructions` with `fee_payer` at account index 0.
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        recent_blockhash: Blockhash,
    ) -> Result<Self, SolError> {
        struct Entry {
            pubkey: Pubkey,
            is_signer: bool,
            is_writable: bool,
        }

        let mut entries: Vec<Entry> = Vec::new();
        let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(Entry {
                    pubkey,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        upsert(*fee_payer, true, true);
        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Stable sort keeps insertion order inside a category, so the fee
        // payer stays first among writable signers.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        if entries.len() > u8::MAX as usize {
            return Err(SolError::TransactionBuildError(format!(
                "too many accounts: {}",
                entries.len()
            )));
        }

        let count = |pred: fn(&Entry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
        let num_required_signatures = count(|e| e.is_signer);
        let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
        let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

        let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();
        let index_of = |key: &Pubkey| -> Result<u8, SolError> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| SolError::TransactionBuildError(format!("{key} not in account keys")))
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let account_indices = ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<Result<Vec<_>, _>>()?;
            compiled.push(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Keys whose signatures this message requires, in slot order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        let n = (self.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    /// The bytes covered by every signature.
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(64 + 32 * self.account_keys.len());
        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        encode_len(self.account_keys.len(), &mut buf)?;
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(&self.recent_blockhash.to_bytes());

        encode_len(self.instructions.len(), &mut buf)?;
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            encode_len(ix.account_indices.len(), &mut buf)?;
            buf.extend_from_slice(&ix.account_indices);
            encode_len(ix.data.len(), &mut buf)?;
            buf.extend_from_slice(&ix.data);
        }
        Ok(buf)
    }

    fn deserialize(data: &[u8]) -> Result<(Self, usize), SolError> {
        let mut r = Reader { data, pos: 0 };

        let num_required_signatures = r.u8()?;
        let num_readonly_signed = r.u8()?;
        let num_readonly_unsigned = r.u8()?;

        let num_accounts = r.compact()?;
        let mut account_keys = Vec::with_capacity(num_accounts);
        for _ in 0..num_accounts {
            account_keys.push(Pubkey::new(r.array::<32>()?));
        }

        let recent_blockhash = Blockhash::new(r.array::<32>()?);

        let num_instructions = r.compact()?;
        let mut instructions = Vec::with_capacity(num_instructions);
        for _ in 0..num_instructions {
            let program_id_index = r.u8()?;
            let n = r.compact()?;
            let account_indices = r.bytes(n)?.to_vec();
            let len = r.compact()?;
            let data = r.bytes(len)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data,
            });
        }

        let message = Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash,
            instructions,
        };
        Ok((message, r.pos))
    }

    /// Every System Program transfer carried by this message.
    pub fn system_transfers(&self) -> Vec<SystemTransfer> {
        self.instructions
            .iter()
            .filter_map(|ix| {
                let program = self.account_keys.get(ix.program_id_index as usize)?;
                if *program != SYSTEM_PROGRAM_ID || ix.data.len() != 12 {
                    return None;
                }
                let index = u32::from_le_bytes(ix.data[..4].try_into().ok()?);
                if index != SYSTEM_TRANSFER_IX_INDEX {
                    return None;
                }
                let lamports = u64::from_le_bytes(ix.data[4..].try_into().ok()?);
                let from = self.account_keys.get(*ix.account_indices.first()? as usize)?;
                let to = self.account_keys.get(*ix.account_indices.get(1)? as usize)?;
                Some(SystemTransfer {
                    from: *from,
                    to: *to,
                    lamports,
                })
            })
            .collect()
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&mut self, n: usize) -> Result<&'a [u8], SolError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len());
        let end = end.ok_or_else(|| {
            SolError::SerializationError(format!("truncated: need {n} bytes at offset {}", self.pos))
        })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, SolError> {
        Ok(self.bytes(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], SolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn compact(&mut self) -> Result<usize, SolError> {
        let (value, used) = decode_compact_u16(&self.data[self.pos.min(self.data.len())..])?;
        self.pos += used;
        Ok(value as usize)
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A message plus one signature slot per required signer.
///
/// Empty slots hold the all-zero signature until filled by [`Transaction::sign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    pub fn new_unsigned(message: Message) -> Self {
        let slots = message.num_required_signatures as usize;
        Self {
            signatures: vec![Signature::default(); slots],
            message,
        }
    }

    /// Sign with `keypair`, filling the slot that matches its public key.
    pub fn sign(&mut self, keypair: &Keypair) -> Result<Signature, SolError> {
        let pubkey = keypair.pubkey();
        let slot = self
            .message
            .signer_keys()
            .iter()
            .position(|k| *k == pubkey)
            .ok_or_else(|| {
                SolError::SigningError(format!("{pubkey} is not a signer of this transaction"))
            })?;
        let signature = keypair.sign(&self.message.serialize()?);
        let slots = self.signatures.len();
        let entry = self.signatures.get_mut(slot).ok_or_else(|| {
            SolError::SigningError(format!("no signature slot {slot}, transaction has {slots}"))
        })?;
        *entry = signature;
        Ok(signature)
    }

    /// The transaction id: the fee payer's signature.
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatures.len() == self.message.num_required_signatures as usize
            && self.signatures.iter().all(|s| *s != Signature::default())
    }

    /// Check every signature slot against its signer.
    pub fn verify(&self) -> Result<(), SolError> {
        let message = self.message.serialize()?;
        let signers = self.message.signer_keys();
        if signers.len() != self.signatures.len() {
            return Err(SolError::InvalidSignature(format!(
                "{} signatures for {} signers",
                self.signatures.len(),
                signers.len()
            )));
        }
        for (signer, signature) in signers.iter().zip(&self.signatures) {
            if !signature.verify(signer, &message) {
                return Err(SolError::InvalidSignature(format!(
                    "signature for {signer} does not verify"
                )));
            }
        }
        Ok(())
    }

    /// Serialize to wire format, ready for `sendTransaction`.
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let message = self.message.serialize()?;
        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + message.len());
        encode_len(self.signatures.len(), &mut wire)?;
        for sig in &self.signatures {
            wire.extend_from_slice(&sig.to_bytes());
        }
        wire.extend_from_slice(&message);
        Ok(wire)
    }

    /// Parse a wire-format transaction.
    pub fn deserialize(wire: &[u8]) -> Result<Self, SolError> {
        let mut r = Reader { data: wire, pos: 0 };
        let num_sigs = r.compact()?;
        let mut signatures = Vec::with_capacity(num_sigs);
        for _ in 0..num_sigs {
            signatures.push(Signature::new(r.array::<64>()?));
        }

        let (message, used) = Message::deserialize(&wire[r.pos..])?;
        if r.pos + used != wire.len() {
            return Err(SolError::SerializationError(format!(
                "{} trailing bytes after message",
                wire.len() - r.pos - used
            )));
        }
        if signatures.len() != message.num_required_signatures as usize {
            return Err(SolError::SerializationError(format!(
                "{} signatures for {} required signers",
                signatures.len(),
                message.num_required_signatures
            )));
        }
        Ok(Self {
            signatures,
            message,
        })
    }
}

/// Build an unsigned single-instruction SOL transfer paid by `from`.
pub fn build_transfer(
    from: &Pubkey,
    to: &Pubkey,
    lamports: u64,
    recent_blockhash: Blockhash,
) -> Result<Transaction, SolError> {
    if lamports == 0 {
        return Err(SolError::TransactionBuildError(
            "lamports must be > 0".into(),
        ));
    }
    let instruction = transfer_instruction(from, to, lamports);
    let message = Message::compile(&[instruction], from, recent_blockhash)?;
    Ok(Transaction::new_unsigned(message))
}
