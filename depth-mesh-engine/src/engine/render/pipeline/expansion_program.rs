use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;
use constants::render_settings::{BOX_VERTEX_COUNT, DISC_VERTEX_COUNT, QUAD_VERTEX_COUNT};
use serde::{Deserialize, Serialize};

use crate::engine::assets::pipeline_settings::PipelineSettings;

/// The two programs the expansion stage draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpansionProgram {
    /// One point per lattice vertex, no geometry generated.
    PassThrough,
    /// Every lattice point expanded into a [`PrimitiveShape`].
    Expand,
}

impl ExpansionProgram {
    pub fn for_transform(enabled: bool) -> Self {
        if enabled { Self::Expand } else { Self::PassThrough }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::PassThrough => "pass_through",
            Self::Expand => "expand",
        }
    }

    pub fn topology(self) -> PrimitiveTopology {
        match self {
            Self::PassThrough => PrimitiveTopology::PointList,
            Self::Expand => PrimitiveTopology::TriangleList,
        }
    }
}

/// Geometry generated around each point while expanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveShape {
    /// Camera-independent quad spanning the point and its right and lower
    /// neighbours. Edge points reuse themselves as the missing neighbour.
    #[default]
    Quad,
    /// Box centred on the point, rotating over time.
    Box,
    /// Flat disc centred on the point.
    Disc,
}

impl PrimitiveShape {
    pub const ALL: [Self; 3] = [Self::Quad, Self::Box, Self::Disc];

    pub fn vertices_per_primitive(self) -> u32 {
        match self {
            Self::Quad => QUAD_VERTEX_COUNT,
            Self::Box => BOX_VERTEX_COUNT,
            Self::Disc => DISC_VERTEX_COUNT,
        }
    }

    pub fn shader_def(self) -> &'static str {
        match self {
            Self::Quad => "SHAPE_QUAD",
            Self::Box => "SHAPE_BOX",
            Self::Disc => "SHAPE_DISC",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Quad => 0,
            Self::Box => 1,
            Self::Disc => 2,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

/// Vertices the draw call issues for `texel_count` lattice points.
pub fn draw_vertex_count(program: ExpansionProgram, shape: PrimitiveShape, texel_count: u32) -> u32 {
    match program {
        ExpansionProgram::PassThrough => texel_count,
        ExpansionProgram::Expand => texel_count.saturating_mul(shape.vertices_per_primitive()),
    }
}

/// Which expansion program the next frame draws with.
///
/// Switching is edge triggered: only a change of the transform flag selects
/// the other program, repeated requests leave the selection untouched.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ExpansionSelector {
    program: ExpansionProgram,
}

impl ExpansionSelector {
    pub fn new(transform_enabled: bool) -> Self {
        Self {
            program: ExpansionProgram::for_transform(transform_enabled),
        }
    }

    pub fn program(&self) -> ExpansionProgram {
        self.program
    }

    pub fn transform_enabled(&self) -> bool {
        self.program == ExpansionProgram::Expand
    }

    /// Returns whether the selection changed.
    pub fn set_transform_enabled(&mut self, enabled: bool) -> bool {
        let program = ExpansionProgram::for_transform(enabled);
        if program == self.program {
            return false;
        }
        self.program = program;
        println!("Expansion program: {}", program.label());
        true
    }
}

impl Default for ExpansionSelector {
    fn default() -> Self {
        Self::new(true)
    }
}

pub fn sync_expansion_program(
    settings: Res<PipelineSettings>,
    mut selector: ResMut<ExpansionSelector>,
) {
    let enabled = settings.expansion.transform_enabled;
    if selector.transform_enabled() != enabled {
        selector.set_transform_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_counts_per_shape() {
        assert_eq!(PrimitiveShape::Quad.vertices_per_primitive(), 6);
        assert_eq!(PrimitiveShape::Box.vertices_per_primitive(), 36);
        assert_eq!(PrimitiveShape::Disc.vertices_per_primitive(), 24);
    }

    #[test]
    fn draw_counts_follow_program() {
        assert_eq!(
            draw_vertex_count(ExpansionProgram::PassThrough, PrimitiveShape::Box, 8),
            8
        );
        assert_eq!(
            draw_vertex_count(ExpansionProgram::Expand, PrimitiveShape::Quad, 8),
            48
        );
        assert_eq!(
            draw_vertex_count(ExpansionProgram::Expand, PrimitiveShape::Box, u32::MAX),
            u32::MAX
        );
    }

    #[test]
    fn toggle_is_edge_triggered() {
        let mut selector = ExpansionSelector::new(true);
        assert_eq!(selector.program(), ExpansionProgram::Expand);

        assert!(!selector.set_transform_enabled(true));
        assert!(selector.set_transform_enabled(false));
        assert_eq!(selector.program(), ExpansionProgram::PassThrough);
        assert!(!selector.set_transform_enabled(false));
        assert!(selector.set_transform_enabled(true));
    }

    #[test]
    fn shapes_cycle() {
        assert_eq!(PrimitiveShape::Quad.next(), PrimitiveShape::Box);
        assert_eq!(PrimitiveShape::Disc.next(), PrimitiveShape::Quad);
    }

    #[test]
    fn selector_tracks_settings() {
        let mut settings = PipelineSettings::default();
        settings.expansion.transform_enabled = false;

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(settings)
            .init_resource::<ExpansionSelector>()
            .add_systems(Update, sync_expansion_program);

        app.update();
        assert_eq!(
            app.world().resource::<ExpansionSelector>().program(),
            ExpansionProgram::PassThrough
        );
    }
}
