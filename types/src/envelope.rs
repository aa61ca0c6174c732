//! Binary envelope exchanged with game clients.
//!
//! Every message is wrapped as `{message_type: u16, payload: bytes}`. Requests
//! carry odd tags, responses even ones, and `ErrorResp` uses `0xFFFF`.

use bytes::{Buf, BufMut};
use commonware_codec::{
    DecodeExt, Encode, EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write,
};
use thiserror::Error as ThisError;

use super::{
    read_string, string_encode_size, write_string, CODE_BAD_REQUEST, MAX_MACHINE_ITEMS,
    MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH, MAX_PAYLOAD_LENGTH,
};

/// Closed set of envelope tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    StartClawGameReq = 1,
    StartClawGameResp = 2,
    AddTouchedItemRecordReq = 3,
    AddTouchedItemRecordResp = 4,
    SpawnItemReq = 5,
    SpawnItemResp = 6,
    GetPullResultWsReq = 7,
    GetPullResultWsResp = 8,
    GetPlayerInfoWsReq = 9,
    GetPlayerInfoWsResp = 10,
    GetClawMachineInfoReq = 11,
    GetClawMachineInfoResp = 12,
    GetGachaMachineInfoReq = 13,
    GetGachaMachineInfoResp = 14,
    GetLeaderboardReq = 15,
    GetLeaderboardResp = 16,
    UpdateScoreReq = 17,
    UpdateScoreResp = 18,
    GetMoleWeightReq = 19,
    GetMoleWeightResp = 20,
    ErrorResp = 0xFFFF,
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
#[error("unknown message type {0}")]
pub struct UnknownMessageType(pub u16);

impl TryFrom<u16> for MessageType {
    type Error = UnknownMessageType;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::StartClawGameReq,
            2 => Self::StartClawGameResp,
            3 => Self::AddTouchedItemRecordReq,
            4 => Self::AddTouchedItemRecordResp,
            5 => Self::SpawnItemReq,
            6 => Self::SpawnItemResp,
            7 => Self::GetPullResultWsReq,
            8 => Self::GetPullResultWsResp,
            9 => Self::GetPlayerInfoWsReq,
            10 => Self::GetPlayerInfoWsResp,
            11 => Self::GetClawMachineInfoReq,
            12 => Self::GetClawMachineInfoResp,
            13 => Self::GetGachaMachineInfoReq,
            14 => Self::GetGachaMachineInfoResp,
            15 => Self::GetLeaderboardReq,
            16 => Self::GetLeaderboardResp,
            17 => Self::UpdateScoreReq,
            18 => Self::UpdateScoreResp,
            19 => Self::GetMoleWeightReq,
            20 => Self::GetMoleWeightResp,
            0xFFFF => Self::ErrorResp,
            other => return Err(UnknownMessageType(other)),
        })
    }
}

/// A payload that travels under a fixed envelope tag.
pub trait Message: Encode + Read<Cfg = ()> {
    const TYPE: MessageType;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub message_type: u16,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn wrap<M: Message>(message: &M) -> Self {
        Self {
            message_type: M::TYPE as u16,
            payload: message.encode().to_vec(),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self::wrap(&ErrorResp {
            code,
            message: message.into(),
        })
    }

    /// Response for a tag outside the closed set.
    pub fn unknown_message_type() -> Self {
        Self::error(CODE_BAD_REQUEST, "Unknown message type")
    }

    pub fn kind(&self) -> Result<MessageType, UnknownMessageType> {
        MessageType::try_from(self.message_type)
    }

    /// Decodes the payload as `M`, rejecting a mismatched tag or trailing bytes.
    pub fn open<M: Message>(&self) -> Result<M, Error> {
        if self.message_type != M::TYPE as u16 {
            return Err(Error::Invalid("Envelope", "unexpected message type"));
        }
        M::decode(&mut self.payload.as_slice())
    }
}

impl Write for Envelope {
    fn write(&self, writer: &mut impl BufMut) {
        self.message_type.write(writer);
        self.payload.write(writer);
    }
}

impl Read for Envelope {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            message_type: u16::read(reader)?,
            payload: Vec::<u8>::read_range(reader, 0..=MAX_PAYLOAD_LENGTH)?,
        })
    }
}

impl EncodeSize for Envelope {
    fn encode_size(&self) -> usize {
        self.message_type.encode_size() + self.payload.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorResp {
    pub code: i32,
    pub message: String,
}

impl Message for ErrorResp {
    const TYPE: MessageType = MessageType::ErrorResp;
}

impl Write for ErrorResp {
    fn write(&self, writer: &mut impl BufMut) {
        self.code.write(writer);
        write_string(&self.message, writer);
    }
}

impl Read for ErrorResp {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            code: i32::read(reader)?,
            message: read_string(reader, MAX_MESSAGE_LENGTH)?,
        })
    }
}

impl EncodeSize for ErrorResp {
    fn encode_size(&self) -> usize {
        self.code.encode_size() + string_encode_size(&self.message)
    }
}

// Claw machine

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartClawGameReq {
    pub player_id: u64,
    pub machine_id: u64,
}

impl Message for StartClawGameReq {
    const TYPE: MessageType = MessageType::StartClawGameReq;
}

impl Write for StartClawGameReq {
    fn write(&self, writer: &mut impl BufMut) {
        self.player_id.write(writer);
        self.machine_id.write(writer);
    }
}

impl Read for StartClawGameReq {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            player_id: u64::read(reader)?,
            machine_id: u64::read(reader)?,
        })
    }
}

impl EncodeSize for StartClawGameReq {
    fn encode_size(&self) -> usize {
        self.player_id.encode_size() + self.machine_id.encode_size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatchResult {
    pub item_id: u64,
    pub catched: bool,
}

impl Write for CatchResult {
    fn write(&self, writer: &mut impl BufMut) {
        self.item_id.write(writer);
        self.catched.write(writer);
    }
}

impl Read for CatchResult {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            item_id: u64::read(reader)?,
            catched: bool::read(reader)?,
        })
    }
}

impl EncodeSize for CatchResult {
    fn encode_size(&self) -> usize {
        self.item_id.encode_size() + self.catched.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartClawGameResp {
    pub game_id: u64,
    pub results: Vec<CatchResult>,
}

impl Message for StartClawGameResp {
    const TYPE: MessageType = MessageType::StartClawGameResp;
}

impl Write for StartClawGameResp {
    fn write(&self, writer: &mut impl BufMut) {
        self.game_id.write(writer);
        self.results.write(writer);
    }
}

impl Read for StartClawGameResp {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            game_id: u64::read(reader)?,
            results: Vec::<CatchResult>::read_range(reader, 0..=MAX_MACHINE_ITEMS)?,
        })
    }
}

impl EncodeSize for StartClawGameResp {
    fn encode_size(&self) -> usize {
        self.game_id.encode_size() + self.results.encode_size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddTouchedItemRecordReq {
    pub game_id: u64,
    pub item_id: u64,
    pub catched: bool,
}

impl Message for AddTouchedItemRecordReq {
    const TYPE: MessageType = MessageType::AddTouchedItemRecordReq;
}

impl Write for AddTouchedItemRecordReq {
    fn write(&self, writer: &mut impl BufMut) {
        self.game_id.write(writer);
        self.item_id.write(writer);
        self.catched.write(writer);
    }
}

impl Read for AddTouchedItemRecordReq {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            game_id: u64::read(reader)?,
            item_id: u64::read(reader)?,
            catched: bool::read(reader)?,
        })
    }
}

impl EncodeSize for AddTouchedItemRecordReq {
    fn encode_size(&self) -> usize {
        self.game_id.encode_size() + self.item_id.encode_size() + self.catched.encode_size()
    }
}

/// Acknowledgement used by every request whose only result is success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ack {
    pub success: bool,
}

impl Write for Ack {
    fn write(&self, writer: &mut impl BufMut) {
        self.success.write(writer);
    }
}

impl Read for Ack {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            success: bool::read(reader)?,
        })
    }
}

impl EncodeSize for Ack {
    fn encode_size(&self) -> usize {
        self.success.encode_size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddTouchedItemRecordResp(pub Ack);

impl Message for AddTouchedItemRecordResp {
    const TYPE: MessageType = MessageType::AddTouchedItemRecordResp;
}

impl Write for AddTouchedItemRecordResp {
    fn write(&self, writer: &mut impl BufMut) {
        self.0.write(writer);
    }
}

impl Read for AddTouchedItemRecordResp {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self(Ack::read(reader)?))
    }
}

impl EncodeSize for AddTouchedItemRecordResp {
    fn encode_size(&self) -> usize {
        self.0.encode_size()
    }
}

/// Request carrying only a machine id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MachineRef {
    pub machine_id: u64,
}

impl Write for MachineRef {
    fn write(&self, writer: &mut impl BufMut) {
        self.machine_id.write(writer);
    }
}

impl Read for MachineRef {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            machine_id: u64::read(reader)?,
        })
    }
}

impl EncodeSize for MachineRef {
    fn encode_size(&self) -> usize {
        self.machine_id.encode_size()
    }
}

/// Request carrying only a player id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerRef {
    pub player_id: u64,
}

impl Write for PlayerRef {
    fn write(&self, writer: &mut impl BufMut) {
        self.player_id.write(writer);
    }
}

impl Read for PlayerRef {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            player_id: u64::read(reader)?,
        })
    }
}

impl EncodeSize for PlayerRef {
    fn encode_size(&self) -> usize {
        self.player_id.encode_size()
    }
}

/// Ordered list of item ids.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ItemIds(pub Vec<u64>);

impl Write for ItemIds {
    fn write(&self, writer: &mut impl BufMut) {
        self.0.write(writer);
    }
}

impl Read for ItemIds {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self(Vec::<u64>::read_range(reader, 0..=MAX_MACHINE_ITEMS)?))
    }
}

impl EncodeSize for ItemIds {
    fn encode_size(&self) -> usize {
        self.0.encode_size()
    }
}

macro_rules! tagged {
    ($name:ident, $inner:ty, $tag:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name(pub $inner);

        impl Message for $name {
            const TYPE: MessageType = MessageType::$tag;
        }

        impl Write for $name {
            fn write(&self, writer: &mut impl BufMut) {
                self.0.write(writer);
            }
        }

        impl Read for $name {
            type Cfg = ();

            fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
                Ok(Self(<$inner>::read(reader)?))
            }
        }

        impl EncodeSize for $name {
            fn encode_size(&self) -> usize {
                self.0.encode_size()
            }
        }
    };
}

tagged!(SpawnItemReq, MachineRef, SpawnItemReq);
tagged!(SpawnItemResp, ItemIds, SpawnItemResp);
tagged!(GetPullResultWsResp, ItemIds, GetPullResultWsResp);
tagged!(GetPlayerInfoWsReq, PlayerRef, GetPlayerInfoWsReq);
tagged!(GetClawMachineInfoReq, MachineRef, GetClawMachineInfoReq);
tagged!(GetGachaMachineInfoReq, MachineRef, GetGachaMachineInfoReq);
tagged!(GetLeaderboardReq, PlayerRef, GetLeaderboardReq);
tagged!(UpdateScoreResp, Ack, UpdateScoreResp);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct GetMoleWeightReq;

impl Message for GetMoleWeightReq {
    const TYPE: MessageType = MessageType::GetMoleWeightReq;
}

impl Write for GetMoleWeightReq {
    fn write(&self, _: &mut impl BufMut) {}
}

impl Read for GetMoleWeightReq {
    type Cfg = ();

    fn read_cfg(_: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self)
    }
}

impl EncodeSize for GetMoleWeightReq {
    fn encode_size(&self) -> usize {
        0
    }
}

// Gacha machine

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GetPullResultWsReq {
    pub player_id: u64,
    pub machine_id: u64,
    pub pull_count: i32,
}

impl Message for GetPullResultWsReq {
    const TYPE: MessageType = MessageType::GetPullResultWsReq;
}

impl Write for GetPullResultWsReq {
    fn write(&self, writer: &mut impl BufMut) {
        self.player_id.write(writer);
        self.machine_id.write(writer);
        self.pull_count.write(writer);
    }
}

impl Read for GetPullResultWsReq {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            player_id: u64::read(reader)?,
            machine_id: u64::read(reader)?,
            pull_count: i32::read(reader)?,
        })
    }
}

impl EncodeSize for GetPullResultWsReq {
    fn encode_size(&self) -> usize {
        self.player_id.encode_size() + self.machine_id.encode_size() + self.pull_count.encode_size()
    }
}

// Snapshots

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetPlayerInfoWsResp {
    pub player_id: u64,
    pub username: String,
    pub coin: i64,
    pub diamond: i64,
}

impl Message for GetPlayerInfoWsResp {
    const TYPE: MessageType = MessageType::GetPlayerInfoWsResp;
}

impl Write for GetPlayerInfoWsResp {
    fn write(&self, writer: &mut impl BufMut) {
        self.player_id.write(writer);
        write_string(&self.username, writer);
        self.coin.write(writer);
        self.diamond.write(writer);
    }
}

impl Read for GetPlayerInfoWsResp {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            player_id: u64::read(reader)?,
            username: read_string(reader, MAX_NAME_LENGTH)?,
            coin: i64::read(reader)?,
            diamond: i64::read(reader)?,
        })
    }
}

impl EncodeSize for GetPlayerInfoWsResp {
    fn encode_size(&self) -> usize {
        self.player_id.encode_size()
            + string_encode_size(&self.username)
            + self.coin.encode_size()
            + self.diamond.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClawItemInfo {
    pub item_id: u64,
    pub name: String,
    pub rarity: String,
    pub spawn_percentage: i64,
    pub catch_percentage: i64,
    pub max_item_spawned: i64,
}

impl Write for ClawItemInfo {
    fn write(&self, writer: &mut impl BufMut) {
        self.item_id.write(writer);
        write_string(&self.name, writer);
        write_string(&self.rarity, writer);
        self.spawn_percentage.write(writer);
        self.catch_percentage.write(writer);
        self.max_item_spawned.write(writer);
    }
}

impl Read for ClawItemInfo {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            item_id: u64::read(reader)?,
            name: read_string(reader, MAX_NAME_LENGTH)?,
            rarity: read_string(reader, MAX_NAME_LENGTH)?,
            spawn_percentage: i64::read(reader)?,
            catch_percentage: i64::read(reader)?,
            max_item_spawned: i64::read(reader)?,
        })
    }
}

impl EncodeSize for ClawItemInfo {
    fn encode_size(&self) -> usize {
        self.item_id.encode_size()
            + string_encode_size(&self.name)
            + string_encode_size(&self.rarity)
            + self.spawn_percentage.encode_size()
            + self.catch_percentage.encode_size()
            + self.max_item_spawned.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetClawMachineInfoResp {
    pub machine_id: u64,
    pub name: String,
    pub price: i64,
    pub max_item: i32,
    pub items: Vec<ClawItemInfo>,
}

impl Message for GetClawMachineInfoResp {
    const TYPE: MessageType = MessageType::GetClawMachineInfoResp;
}

impl Write for GetClawMachineInfoResp {
    fn write(&self, writer: &mut impl BufMut) {
        self.machine_id.write(writer);
        write_string(&self.name, writer);
        self.price.write(writer);
        self.max_item.write(writer);
        self.items.write(writer);
    }
}

impl Read for GetClawMachineInfoResp {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            machine_id: u64::read(reader)?,
            name: read_string(reader, MAX_NAME_LENGTH)?,
            price: i64::read(reader)?,
            max_item: i32::read(reader)?,
            items: Vec::<ClawItemInfo>::read_range(reader, 0..=MAX_MACHINE_ITEMS)?,
        })
    }
}

impl EncodeSize for GetClawMachineInfoResp {
    fn encode_size(&self) -> usize {
        self.machine_id.encode_size()
            + string_encode_size(&self.name)
            + self.price.encode_size()
            + self.max_item.encode_size()
            + self.items.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GachaItemInfo {
    pub item_id: u64,
    pub name: String,
    pub rarity: String,
    pub pull_weight: i32,
}

impl Write for GachaItemInfo {
    fn write(&self, writer: &mut impl BufMut) {
        self.item_id.write(writer);
        write_string(&self.name, writer);
        write_string(&self.rarity, writer);
        self.pull_weight.write(writer);
    }
}

impl Read for GachaItemInfo {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            item_id: u64::read(reader)?,
            name: read_string(reader, MAX_NAME_LENGTH)?,
            rarity: read_string(reader, MAX_NAME_LENGTH)?,
            pull_weight: i32::read(reader)?,
        })
    }
}

impl EncodeSize for GachaItemInfo {
    fn encode_size(&self) -> usize {
        self.item_id.encode_size()
            + string_encode_size(&self.name)
            + string_encode_size(&self.rarity)
            + self.pull_weight.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetGachaMachineInfoResp {
    pub machine_id: u64,
    pub name: String,
    pub price: i64,
    pub price_times_ten: i64,
    pub super_rare_pity: i32,
    pub ultra_rare_pity: i32,
    pub items: Vec<GachaItemInfo>,
}

impl Message for GetGachaMachineInfoResp {
    const TYPE: MessageType = MessageType::GetGachaMachineInfoResp;
}

impl Write for GetGachaMachineInfoResp {
    fn write(&self, writer: &mut impl BufMut) {
        self.machine_id.write(writer);
        write_string(&self.name, writer);
        self.price.write(writer);
        self.price_times_ten.write(writer);
        self.super_rare_pity.write(writer);
        self.ultra_rare_pity.write(writer);
        self.items.write(writer);
    }
}

impl Read for GetGachaMachineInfoResp {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            machine_id: u64::read(reader)?,
            name: read_string(reader, MAX_NAME_LENGTH)?,
            price: i64::read(reader)?,
            price_times_ten: i64::read(reader)?,
            super_rare_pity: i32::read(reader)?,
            ultra_rare_pity: i32::read(reader)?,
            items: Vec::<GachaItemInfo>::read_range(reader, 0..=MAX_MACHINE_ITEMS)?,
        })
    }
}

impl EncodeSize for GetGachaMachineInfoResp {
    fn encode_size(&self) -> usize {
        self.machine_id.encode_size()
            + string_encode_size(&self.name)
            + self.price.encode_size()
            + self.price_times_ten.encode_size()
            + self.super_rare_pity.encode_size()
            + self.ultra_rare_pity.encode_size()
            + self.items.encode_size()
    }
}

// Whack-a-mole

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: i32,
    pub player_id: u64,
    pub username: String,
    pub score: i64,
}

impl Write for LeaderboardEntry {
    fn write(&self, writer: &mut impl BufMut) {
        self.rank.write(writer);
        self.player_id.write(writer);
        write_string(&self.username, writer);
        self.score.write(writer);
    }
}

impl Read for LeaderboardEntry {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            rank: i32::read(reader)?,
            player_id: u64::read(reader)?,
            username: read_string(reader, MAX_NAME_LENGTH)?,
            score: i64::read(reader)?,
        })
    }
}

impl EncodeSize for LeaderboardEntry {
    fn encode_size(&self) -> usize {
        self.rank.encode_size()
            + self.player_id.encode_size()
            + string_encode_size(&self.username)
            + self.score.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetLeaderboardResp {
    pub top_players: Vec<LeaderboardEntry>,
    pub your_rank: i32,
    pub your_score: i64,
}

impl Message for GetLeaderboardResp {
    const TYPE: MessageType = MessageType::GetLeaderboardResp;
}

impl Write for GetLeaderboardResp {
    fn write(&self, writer: &mut impl BufMut) {
        self.top_players.write(writer);
        self.your_rank.write(writer);
        self.your_score.write(writer);
    }
}

impl Read for GetLeaderboardResp {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            top_players: Vec::<LeaderboardEntry>::read_range(reader, 0..=MAX_MACHINE_ITEMS)?,
            your_rank: i32::read(reader)?,
            your_score: i64::read(reader)?,
        })
    }
}

impl EncodeSize for GetLeaderboardResp {
    fn encode_size(&self) -> usize {
        self.top_players.encode_size()
            + self.your_rank.encode_size()
            + self.your_score.encode_size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateScoreReq {
    pub player_id: u64,
    pub score: i64,
}

impl Message for UpdateScoreReq {
    const TYPE: MessageType = MessageType::UpdateScoreReq;
}

impl Write for UpdateScoreReq {
    fn write(&self, writer: &mut impl BufMut) {
        self.player_id.write(writer);
        self.score.write(writer);
    }
}

impl Read for UpdateScoreReq {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            player_id: u64::read(reader)?,
            score: i64::read(reader)?,
        })
    }
}

impl EncodeSize for UpdateScoreReq {
    fn encode_size(&self) -> usize {
        self.player_id.encode_size() + self.score.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoleInfo {
    pub mole_type: String,
    pub weight: i32,
}

impl Write for MoleInfo {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.mole_type, writer);
        self.weight.write(writer);
    }
}

impl Read for MoleInfo {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            mole_type: read_string(reader, MAX_NAME_LENGTH)?,
            weight: i32::read(reader)?,
        })
    }
}

impl EncodeSize for MoleInfo {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.mole_type) + self.weight.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetMoleWeightResp {
    pub moles: Vec<MoleInfo>,
}

impl Message for GetMoleWeightResp {
    const TYPE: MessageType = MessageType::GetMoleWeightResp;
}

impl Write for GetMoleWeightResp {
    fn write(&self, writer: &mut impl BufMut) {
        self.moles.write(writer);
    }
}

impl Read for GetMoleWeightResp {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            moles: Vec::<MoleInfo>::read_range(reader, 0..=MAX_MACHINE_ITEMS)?,
        })
    }
}

impl EncodeSize for GetMoleWeightResp {
    fn encode_size(&self) -> usize {
        self.moles.encode_size()
    }
}
