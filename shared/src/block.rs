//! Block type ids understood by classic clients.

/// Highest block id a client may legally place.
pub const MAX_LEGAL_BLOCK_TYPE: u8 = 49;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Block {
    Air = 0,
    Stone = 1,
    Grass = 2,
    Dirt = 3,
    Cobblestone = 4,
    Plank = 5,
    Sapling = 6,
    Admincrete = 7,
    Water = 8,
    StillWater = 9,
    Lava = 10,
    StillLava = 11,
    Sand = 12,
    Gravel = 13,
    GoldOre = 14,
    IronOre = 15,
    CoalOre = 16,
    Log = 17,
    Leaves = 18,
    Sponge = 19,
    Glass = 20,
    Red = 21,
    Orange = 22,
    Yellow = 23,
    Lime = 24,
    Green = 25,
    Teal = 26,
    Aqua = 27,
    Cyan = 28,
    Blue = 29,
    Indigo = 30,
    Violet = 31,
    Magenta = 32,
    Pink = 33,
    Black = 34,
    Gray = 35,
    White = 36,
    YellowFlower = 37,
    RedFlower = 38,
    BrownMushroom = 39,
    RedMushroom = 40,
    Gold = 41,
    Iron = 42,
    DoubleStair = 43,
    Stair = 44,
    Brick = 45,
    Tnt = 46,
    Books = 47,
    MossyRocks = 48,
    Obsidian = 49,
}

impl Block {
    const ALL: [Block; MAX_LEGAL_BLOCK_TYPE as usize + 1] = [
        Block::Air,
        Block::Stone,
        Block::Grass,
        Block::Dirt,
        Block::Cobblestone,
        Block::Plank,
        Block::Sapling,
        Block::Admincrete,
        Block::Water,
        Block::StillWater,
        Block::Lava,
        Block::StillLava,
        Block::Sand,
        Block::Gravel,
        Block::GoldOre,
        Block::IronOre,
        Block::CoalOre,
        Block::Log,
        Block::Leaves,
        Block::Sponge,
        Block::Glass,
        Block::Red,
        Block::Orange,
        Block::Yellow,
        Block::Lime,
        Block::Green,
        Block::Teal,
        Block::Aqua,
        Block::Cyan,
        Block::Blue,
        Block::Indigo,
        Block::Violet,
        Block::Magenta,
        Block::Pink,
        Block::Black,
        Block::Gray,
        Block::White,
        Block::YellowFlower,
        Block::RedFlower,
        Block::BrownMushroom,
        Block::RedMushroom,
        Block::Gold,
        Block::Iron,
        Block::DoubleStair,
        Block::Stair,
        Block::Brick,
        Block::Tnt,
        Block::Books,
        Block::MossyRocks,
        Block::Obsidian,
    ];

    /// Looks up a block by its wire id. Returns None above `MAX_LEGAL_BLOCK_TYPE`.
    pub fn from_id(id: u8) -> Option<Block> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Fluids and admincrete may only be placed by operators.
    pub fn is_restricted(self) -> bool {
        matches!(
            self,
            Block::Water | Block::StillWater | Block::Lava | Block::StillLava | Block::Admincrete
        )
    }
}
