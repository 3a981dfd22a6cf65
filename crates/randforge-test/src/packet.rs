//! A packet with a packed header, a payload and shared configuration.

use randforge::prelude::*;

use crate::hierarchy::Env;

/// Packed header: `valid` (1 bit), `address` (32 bits), `kind` (2 bits).
#[derive(Debug, Struct)]
pub struct PacketHeader {
    pub valid: Bool,
    #[randforge(format = "hex")]
    pub address: Uint32,
    pub kind: Logic,
}

impl PacketHeader {
    pub fn new() -> Self {
        Self {
            valid: Bool::new(false),
            address: Uint32::new(0),
            kind: Logic::enumeration([("READ", 0), ("WRITE", 1), ("IDLE", 2)], "IDLE"),
        }
    }
}

impl Default for PacketHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration shared by many packets; randomized on its own.
#[derive(Debug, Fields)]
pub struct Config {
    #[randforge(object)]
    pub object: Object,
    pub max_len: Uint8,
}

impl Config {
    pub fn new(max_len: u8) -> Self {
        Self {
            object: Object::new("config", Some(&Env::default())),
            max_len: Uint8::new(max_len).with_auto_random(false),
        }
    }
}

impl Aggregate for Config {}

#[derive(Debug, Fields)]
pub struct Packet {
    #[randforge(object)]
    pub object: Object,
    pub header: PacketHeader,
    pub len: Uint8,
    pub payload: Vec<Uint8>,
    pub config: Shared<Config>,
}

impl Packet {
    /// A packet with `payload_len` payload bytes whose `len` must stay in
    /// `1..=max_len` and whose header must be valid.
    pub fn new(config: Shared<Config>, payload_len: usize) -> Self {
        let max_len = config.borrow().max_len.value();
        let mut packet = Self {
            object: Object::new("packet", Some(&Env::default())),
            header: PacketHeader::new(),
            len: Uint8::new(0),
            payload: (0..payload_len).map(|_| Uint8::new(0)).collect(),
            config,
        };
        let len = vec![packet.len.arg()];
        packet.add_constraint(
            "len",
            Predicate::unary(move |len| len.within(1u8, max_len)),
            len,
        );
        let valid = vec![packet.header.valid.arg()];
        packet.add_constraint("valid", Predicate::unary(|v| v.eq(true)), valid);
        packet
    }
}

impl Aggregate for Packet {}
