pub mod column_profile;
pub mod conversation;
pub mod fingerprint;
pub mod knowledge_graph;
pub mod raw_schema;
pub mod relationship;
pub mod semantic_layer;

pub use column_profile::{Anomalies, ColumnProfile, DatePattern, IdPattern, Patterns, ProfileMap};
pub use conversation::{
    AgentKind, CellValue, ChartSuggestion, ChatRequest, ChatResponse, ColumnKind, DataFrame,
    Message, ResponseMode, Role as ConversationRole,
};
pub use fingerprint::{Fingerprint, FingerprintMap, Role, RiskProfile};
pub use knowledge_graph::{
    data_quality_score, BusinessDomain, ClientNode, ColumnNode, ColumnRole, DomainNode,
    EdgeCardinality, EntityNode, GraphSummary, KnowledgeGraph, MetricNode, RelationshipEdge,
    SemanticRole, TableNode,
};
pub use raw_schema::{
    Cardinality, ColumnDef, ForeignKeyDef, IndexDef, RawSchema, TableSchema, UniqueConstraintDef,
};
pub use relationship::{Relationship, RelationshipSet, RelationshipSummary, RelationshipType};
pub use semantic_layer::{LayerSummary, SemanticLayer, TableEntry};
