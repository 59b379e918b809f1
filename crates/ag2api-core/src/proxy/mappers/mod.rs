// Mappers module - protocol converters

pub mod claude;
pub mod mcp_xml;
