//! Prefilled `arena` blocks for editor insert commands

pub const FENCE_LANG: &str = "arena";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Block,
    Channel,
    RandomPersonal,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::Block, Template::Channel, Template::RandomPersonal];

    pub fn body(&self) -> &'static str {
        match self {
            Template::Block => "https://www.are.na/block/",
            Template::Channel => "https://www.are.na/channel/",
            Template::RandomPersonal => crate::classify::RANDOM_PERSONAL,
        }
    }

    /// Fenced block ready to insert at the cursor
    pub fn render(&self) -> String {
        format!("```{FENCE_LANG}\n{}\n```\n", self.body())
    }
}
