//! Column positions of the WordPress tables the migration reads.
//!
//! Dump tuples are positional. Every offset the mappers use is declared here,
//! once per table, against the stock WordPress schema.

/// A named column of one source table.
pub trait Column: Copy {
    /// Table name without the WordPress prefix.
    const TABLE: &'static str;

    /// Column names of the stock schema, in order.
    const COLUMNS: &'static [&'static str];

    /// Zero-based position in the tuple.
    fn index(self) -> usize;
}

/// `wp_terms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermColumn {
    TermId = 0,
    Name = 1,
    Slug = 2,
    TermGroup = 3,
}

impl Column for TermColumn {
    const TABLE: &'static str = "terms";
    const COLUMNS: &'static [&'static str] = &["term_id", "name", "slug", "term_group"];

    fn index(self) -> usize {
        self as usize
    }
}

/// `wp_term_taxonomy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyColumn {
    TermTaxonomyId = 0,
    TermId = 1,
    Taxonomy = 2,
    Description = 3,
    Parent = 4,
    Count = 5,
}

impl Column for TaxonomyColumn {
    const TABLE: &'static str = "term_taxonomy";
    const COLUMNS: &'static [&'static str] = &[
        "term_taxonomy_id",
        "term_id",
        "taxonomy",
        "description",
        "parent",
        "count",
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// `wp_posts` (only the columns the migration reads are named).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostColumn {
    Id = 0,
    Author = 1,
    Date = 2,
    DateGmt = 3,
    Content = 4,
    Title = 5,
    Excerpt = 6,
    Status = 7,
    Name = 11,
    Parent = 17,
    MenuOrder = 19,
    Type = 20,
}

impl Column for PostColumn {
    const TABLE: &'static str = "posts";
    const COLUMNS: &'static [&'static str] = &[
        "ID",
        "post_author",
        "post_date",
        "post_date_gmt",
        "post_content",
        "post_title",
        "post_excerpt",
        "post_status",
        "comment_status",
        "ping_status",
        "post_password",
        "post_name",
        "to_ping",
        "pinged",
        "post_modified",
        "post_modified_gmt",
        "post_content_filtered",
        "post_parent",
        "guid",
        "menu_order",
        "post_type",
        "post_mime_type",
        "comment_count",
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// `wp_term_relationships`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipColumn {
    ObjectId = 0,
    TermTaxonomyId = 1,
    TermOrder = 2,
}

impl Column for RelationshipColumn {
    const TABLE: &'static str = "term_relationships";
    const COLUMNS: &'static [&'static str] = &["object_id", "term_taxonomy_id", "term_order"];

    fn index(self) -> usize {
        self as usize
    }
}
