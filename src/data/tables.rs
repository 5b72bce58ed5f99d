//node_id has no declared type so numeric ids stay INTEGER and text ids stay TEXT
pub const READING_TABLE: &str = "CREATE TABLE IF NOT EXISTS opcua_nodes (
                                id INTEGER PRIMARY KEY AUTOINCREMENT,
                                node_id NOT NULL,
                                value REAL NOT NULL,
                                timestamp TEXT NOT NULL
                            );";

pub const READING_NODE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS opcua_nodes_node_id ON opcua_nodes (node_id);";
