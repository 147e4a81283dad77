//! The fixed, empty world every player spawns into.
//!
//! Nothing here changes after start-up. The registry codec is built once and
//! embedded in every join frame.

use shared::nbt::{
    compound, flag, network_root, string, BaseNbt, NbtCompound, NbtList, NbtTag,
};

/// Entity id handed to every player; there is never more than one entity in
/// view, so it does not need to be unique.
pub const PLAYER_ENTITY_ID: i32 = 100;

/// Block the player is placed at, inside chunk (0, 0).
pub const SPAWN_X: i32 = 8;
pub const SPAWN_Y: i32 = 60;
pub const SPAWN_Z: i32 = 8;

/// Vertical extent of the void dimension.
pub const WORLD_HEIGHT: u32 = 256;

pub const VIEW_DISTANCE: i32 = 1;
pub const SIMULATION_DISTANCE: i32 = 1;

/// Implementation name sent on the brand channel.
pub const BRAND: &str = "hollow";

/// Dimension type of the spawn dimension; must be present in the codec.
pub const DIMENSION_TYPE: &str = "minecraft:the_end";

/// Dimension the player spawns into.
pub const DIMENSION_NAME: &str = "hollow:void";

/// Every dimension the client is told exists.
pub const DIMENSION_NAMES: &[&str] = &[
    "minecraft:overworld",
    "minecraft:the_nether",
    "minecraft:the_end",
    DIMENSION_NAME,
];

/// Builds the registry codec sent in the join frame: dimension types, one
/// biome and the chat types.
pub fn dimension_codec() -> BaseNbt {
    network_root(registries())
}

fn registries() -> NbtCompound {
    compound([
        (
            "minecraft:dimension_type",
            registry(
                "minecraft:dimension_type",
                vec![
                    ("minecraft:overworld", overworld_type()),
                    (DIMENSION_TYPE, void_type()),
                ],
            ),
        ),
        (
            "minecraft:worldgen/biome",
            registry("minecraft:worldgen/biome", vec![("minecraft:plains", plains())]),
        ),
        (
            "minecraft:chat_type",
            registry(
                "minecraft:chat_type",
                vec![
                    ("minecraft:chat", chat_type("chat.type.text", "chat")),
                    ("minecraft:system", system_chat_type()),
                    ("minecraft:game_info", game_info_chat_type()),
                ],
            ),
        ),
    ])
}

/// Registry entries get ids in the order given.
fn registry(kind: &str, entries: Vec<(&str, NbtCompound)>) -> NbtTag {
    let value = entries
        .into_iter()
        .enumerate()
        .map(|(id, (name, element))| {
            compound([
                ("name", string(name)),
                ("id", NbtTag::Int(id as i32)),
                ("element", NbtTag::Compound(element)),
            ])
        })
        .collect();

    NbtTag::Compound(compound([
        ("type", string(kind)),
        ("value", NbtTag::List(NbtList::Compound(value))),
    ]))
}

/// Flags that differ between the overworld and the void.
struct DimensionFlags {
    natural: bool,
    has_raids: bool,
    has_skylight: bool,
    bed_works: bool,
}

fn dimension_type(
    effects: &str,
    infiniburn: &str,
    flags: DimensionFlags,
    fixed_time: Option<i64>,
) -> NbtCompound {
    let mut entries = vec![
        ("piglin_safe", flag(false)),
        ("has_raids", flag(flags.has_raids)),
        ("monster_spawn_light_level", NbtTag::Int(0)),
        ("monster_spawn_block_light_limit", NbtTag::Int(0)),
        ("natural", flag(flags.natural)),
        ("ambient_light", NbtTag::Float(0.0)),
        ("infiniburn", string(infiniburn)),
        ("respawn_anchor_works", flag(false)),
        ("has_skylight", flag(flags.has_skylight)),
        ("bed_works", flag(flags.bed_works)),
        ("effects", string(effects)),
        ("min_y", NbtTag::Int(0)),
        ("height", NbtTag::Int(WORLD_HEIGHT as i32)),
        ("logical_height", NbtTag::Int(WORLD_HEIGHT as i32)),
        ("coordinate_scale", NbtTag::Double(1.0)),
        ("ultrawarm", flag(false)),
        ("has_ceiling", flag(false)),
    ];
    if let Some(time) = fixed_time {
        entries.push(("fixed_time", NbtTag::Long(time)));
    }
    compound(entries)
}

fn overworld_type() -> NbtCompound {
    dimension_type(
        "minecraft:overworld",
        "#minecraft:infiniburn_overworld",
        DimensionFlags {
            natural: true,
            has_raids: true,
            has_skylight: true,
            bed_works: true,
        },
        None,
    )
}

fn void_type() -> NbtCompound {
    dimension_type(
        "minecraft:the_end",
        "#minecraft:infiniburn_end",
        DimensionFlags {
            natural: false,
            has_raids: false,
            has_skylight: false,
            bed_works: false,
        },
        Some(6000),
    )
}

fn plains() -> NbtCompound {
    let mood_sound = compound([
        ("tick_delay", NbtTag::Int(6000)),
        ("offset", NbtTag::Double(2.0)),
        ("sound", string("minecraft:ambient.cave")),
        ("block_search_extent", NbtTag::Int(8)),
    ]);

    let effects = compound([
        ("sky_color", NbtTag::Int(7_907_327)),
        ("water_fog_color", NbtTag::Int(329_011)),
        ("fog_color", NbtTag::Int(12_638_463)),
        ("water_color", NbtTag::Int(4_159_204)),
        ("mood_sound", NbtTag::Compound(mood_sound)),
    ]);

    compound([
        ("precipitation", string("rain")),
        ("temperature", NbtTag::Float(0.8)),
        ("downfall", NbtTag::Float(0.4)),
        ("effects", NbtTag::Compound(effects)),
    ])
}

fn decoration(translation_key: &str) -> NbtTag {
    NbtTag::Compound(compound([
        ("translation_key", string(translation_key)),
        ("style", NbtTag::Compound(NbtCompound::new())),
        (
            "parameters",
            NbtTag::List(NbtList::String(vec!["sender".into(), "content".into()])),
        ),
    ]))
}

fn chat_type(translation_key: &str, priority: &str) -> NbtCompound {
    compound([
        (
            "chat",
            NbtTag::Compound(compound([("decoration", decoration(translation_key))])),
        ),
        (
            "narration",
            NbtTag::Compound(compound([
                ("priority", string(priority)),
                ("decoration", decoration("chat.type.text.narrate")),
            ])),
        ),
    ])
}

fn system_chat_type() -> NbtCompound {
    compound([
        ("chat", NbtTag::Compound(NbtCompound::new())),
        (
            "narration",
            NbtTag::Compound(compound([("priority", string("system"))])),
        ),
    ])
}

fn game_info_chat_type() -> NbtCompound {
    compound([("overlay", NbtTag::Compound(NbtCompound::new()))])
}
