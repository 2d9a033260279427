use anyhow::Result;
use quartz_nbt::{NbtCompound, NbtTag};

use super::*;
use crate::block_storage::{Block, StateValue};
use crate::document::StructureDocument;

fn stairs(weirdo_direction: i32) -> Block {
    Block::new("minecraft:oak_stairs")
        .with_state("upside_down_bit", false)
        .with_state("weirdo_direction", weirdo_direction)
}

fn chest_data(name: &str) -> NbtCompound {
    let mut data = NbtCompound::new();
    data.insert("CustomName", NbtTag::String(name.to_owned()));
    data
}

/// A 3x2x2 structure with distinct blocks in a few corners, an oriented
/// block, a waterlogged cell, a void cell and a block entity.
fn sample() -> Result<StructureDocument> {
    let mut doc = StructureDocument::new([3, 2, 2], &Block::new(Block::AIR))?;
    doc.set_single(Position::new(0, 0, 0), &Block::new("minecraft:gold_block"))?
        .set_single(Position::new(2, 0, 1), &stairs(3))?
        .set_single(
            Position::new(1, 1, 0),
            &Block::new("minecraft:furnace").with_state("minecraft:cardinal_direction", "east"),
        )?
        .set_single(Position::new(2, 1, 0), &Block::new("minecraft:log").with_state("pillar_axis", "x"))?
        .set_block(Position::new(0, 1, 1), None)?
        .set_waterlogged(Position::new(2, 0, 1), true)?
        .set_single(Position::new(1, 0, 1), &Block::new("minecraft:chest"))?
        .attach_block_entity(Position::new(1, 0, 1), chest_data("loot"))?;
    Ok(doc)
}

/// Every cell resolved to blocks for both layers, in storage order.
fn resolved(doc: &StructureDocument) -> Result<Vec<(Option<Block>, Option<Block>)>> {
    let grid = doc.grid();
    let mut out = Vec::with_capacity(grid.volume());
    for i in 0..grid.volume() {
        let pos = grid.position_of(i);
        out.push((
            doc.get_block_in(pos, Layer::Primary)?.cloned(),
            doc.get_block_in(pos, Layer::Secondary)?.cloned(),
        ));
    }
    Ok(out)
}

#[test]
fn rotation_angles_are_validated() {
    assert_eq!(Rotation::from_degrees(270).ok(), Some(Rotation::Clockwise270));
    for bad in [45, -90, 360, 1] {
        let err = Rotation::from_degrees(bad).expect_err("Bad angle unexpectedly accepted");
        assert!(matches!(err, StructureError::UnsupportedRotationAngle(a) if a == bad));
    }
}

#[test]
fn mirror_axis_parses_either_case() -> Result<()> {
    assert_eq!("x".parse::<MirrorAxis>()?, MirrorAxis::X);
    assert_eq!("Z".parse::<MirrorAxis>()?, MirrorAxis::Z);
    assert!("y".parse::<MirrorAxis>().is_err());
    Ok(())
}

#[test]
fn quarter_turn_swaps_x_and_z() -> Result<()> {
    let mut doc = sample()?;
    let gold = doc.get_block(Position::new(0, 0, 0))?.cloned();

    doc.rotate(90)?;

    assert_eq!(doc.size(), [2, 2, 3]);
    // (x, z) -> (size_z - 1 - z, x)
    assert_eq!(doc.get_block(Position::new(1, 0, 0))?.cloned(), gold);
    Ok(())
}

#[test]
fn half_turn_keeps_extents() -> Result<()> {
    let mut doc = sample()?;
    let gold = doc.get_block(Position::new(0, 0, 0))?.cloned();

    doc.rotate(180)?;

    assert_eq!(doc.size(), [3, 2, 2]);
    assert_eq!(doc.get_block(Position::new(2, 0, 1))?.cloned(), gold);
    Ok(())
}

#[test]
fn rotating_four_times_is_identity() -> Result<()> {
    let original = sample()?;
    let mut doc = original.clone();

    for _ in 0..4 {
        doc.rotate(90)?;
    }

    assert_eq!(doc.size(), original.size());
    assert_eq!(resolved(&doc)?, resolved(&original)?);
    let chest = Position::new(1, 0, 1);
    assert_eq!(doc.block_entity(chest)?, original.block_entity(chest)?);
    // No block stays no block the whole way round
    assert!(doc.get_block(Position::new(0, 1, 1))?.is_none());
    Ok(())
}

#[test]
fn rotation_reorients_states_without_touching_the_source_entry() -> Result<()> {
    let mut doc = sample()?;
    let source = stairs(3);

    doc.rotate(90)?;

    // weirdo_direction 3 is north, a clockwise quarter turn makes it east (0)
    let moved = doc.get_block(Position::new(0, 0, 2))?.cloned();
    assert_eq!(moved, Some(stairs(0)));
    assert!(doc.palette().find(&source).is_some());

    let furnace = doc.get_block(Position::new(1, 1, 1))?.cloned();
    assert_eq!(
        furnace.and_then(|b| b.state("minecraft:cardinal_direction").cloned()),
        Some(StateValue::from("south"))
    );

    let log = doc.get_block(Position::new(1, 1, 2))?.cloned();
    assert_eq!(
        log.and_then(|b| b.state("pillar_axis").cloned()),
        Some(StateValue::from("z"))
    );
    Ok(())
}

#[test]
fn rotation_moves_secondary_layer_and_block_entities() -> Result<()> {
    let mut doc = sample()?;

    doc.rotate(270)?;

    // (x, z) -> (z, size_x - 1 - x)
    assert_eq!(
        doc.get_block_in(Position::new(1, 0, 0), Layer::Secondary)?,
        Some(&Block::water())
    );
    let chest = Position::new(1, 0, 1);
    assert_eq!(doc.block_entity(chest)?, Some(&chest_data("loot")));
    assert_eq!(doc.attachments().block_entity_count(), 1);
    Ok(())
}

#[test]
fn mirroring_twice_is_identity() -> Result<()> {
    let original = sample()?;

    for axis in [MirrorAxis::X, MirrorAxis::Z] {
        let mut doc = original.clone();
        doc.mirror(axis)?;
        assert_ne!(resolved(&doc)?, resolved(&original)?);
        doc.mirror(axis)?;
        assert_eq!(resolved(&doc)?, resolved(&original)?);
        assert_eq!(doc.size(), original.size());
    }
    Ok(())
}

#[test]
fn mirror_flips_only_the_mirrored_axis() -> Result<()> {
    let mut doc = sample()?;

    doc.mirror(MirrorAxis::X)?;
    assert_eq!(
        doc.get_block(Position::new(2, 0, 0))?.map(|b| b.identifier.as_str()),
        Some("minecraft:gold_block")
    );
    // Stairs facing north are unaffected by an east-west reflection
    assert_eq!(doc.get_block(Position::new(0, 0, 1))?.cloned(), Some(stairs(3)));
    assert_eq!(
        doc.get_block(Position::new(1, 1, 0))?
            .and_then(|b| b.state("minecraft:cardinal_direction").cloned()),
        Some(StateValue::from("west"))
    );

    doc.mirror(MirrorAxis::X)?.mirror(MirrorAxis::Z)?;
    assert_eq!(doc.get_block(Position::new(2, 0, 0))?.cloned(), Some(stairs(2)));
    Ok(())
}

#[test]
fn sign_rotation_counts_sixteenths() {
    let table = OrientationTable::bedrock();
    let sign = |r: i32| Block::new("minecraft:standing_sign").with_state("ground_sign_direction", r);

    let turned = table.transform_block(&sign(14), Transform::Rotate(Rotation::Clockwise90));
    assert_eq!(turned, Some(sign(2)));

    let flipped = table.transform_block(&sign(4), Transform::Mirror(MirrorAxis::X));
    assert_eq!(flipped, Some(sign(12)));

    // South stays south when reflecting east to west
    assert_eq!(table.transform_block(&sign(0), Transform::Mirror(MirrorAxis::X)), None);
}

#[test]
fn vertical_facing_is_left_alone() {
    let table = OrientationTable::bedrock();
    let hopper = Block::new("minecraft:hopper").with_state("facing_direction", 0);
    assert_eq!(
        table.transform_block(&hopper, Transform::Rotate(Rotation::Clockwise90)),
        None
    );

    let observer = Block::new("minecraft:observer").with_state("facing_direction", 2);
    assert_eq!(
        table.transform_block(&observer, Transform::Rotate(Rotation::Clockwise90)),
        Some(Block::new("minecraft:observer").with_state("facing_direction", 5))
    );
}

#[test]
fn custom_rules_can_be_scoped_to_identifiers() -> Result<()> {
    let table = OrientationTable::empty().with_rule(
        OrientationRule::new(
            "facing",
            OrientationEncoding::named(&[
                ("north", Direction::North),
                ("east", Direction::East),
                ("south", Direction::South),
                ("west", Direction::West),
            ]),
        )
        .for_identifiers(&["custom:fan"]),
    );

    let fan = Block::new("custom:fan").with_state("facing", "north");
    let other = Block::new("custom:vent").with_state("facing", "north");
    let t = Transform::Rotate(Rotation::Clockwise180);
    assert_eq!(
        table.transform_block(&fan, t),
        Some(Block::new("custom:fan").with_state("facing", "south"))
    );
    assert_eq!(table.transform_block(&other, t), None);

    let mut doc = StructureDocument::new([1, 1, 1], &fan)?;
    doc.transform_with(t, &table)?;
    assert_eq!(doc.palette().len(), 2);
    Ok(())
}
