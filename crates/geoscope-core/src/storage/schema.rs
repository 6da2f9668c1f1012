pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS benchmarks (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  project_id TEXT NOT NULL,
  name TEXT NOT NULL,
  scenario TEXT NOT NULL DEFAULT '',
  target_roles_json TEXT NOT NULL DEFAULT '[]',
  questions_per_stage INTEGER NOT NULL DEFAULT 0,
  total_questions INTEGER NOT NULL DEFAULT 0,
  status TEXT NOT NULL,
  is_active INTEGER NOT NULL DEFAULT 1,
  current_version TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  benchmark_id INTEGER NOT NULL REFERENCES benchmarks(id),
  text TEXT NOT NULL,
  intent TEXT NOT NULL,
  persona_role TEXT NOT NULL DEFAULT '',
  persona_name TEXT NOT NULL DEFAULT '',
  keyword TEXT NOT NULL DEFAULT '',
  source TEXT NOT NULL,
  is_relevant INTEGER NOT NULL DEFAULT 1,
  is_approved INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS benchmark_versions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  benchmark_id INTEGER NOT NULL REFERENCES benchmarks(id),
  version TEXT NOT NULL,
  change_type TEXT NOT NULL,
  change_summary TEXT NOT NULL DEFAULT '',
  run_count INTEGER NOT NULL DEFAULT 0,
  is_current INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL,
  snapshot_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS scheduled_tasks (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  project_id TEXT NOT NULL,
  benchmark_id INTEGER NOT NULL REFERENCES benchmarks(id),
  name TEXT NOT NULL,
  engines_json TEXT NOT NULL DEFAULT '[]',
  channels_json TEXT NOT NULL DEFAULT '[]',
  frequency TEXT NOT NULL,
  day_of_week INTEGER,
  day_of_month INTEGER,
  time_of_day TEXT NOT NULL,
  enabled INTEGER NOT NULL DEFAULT 1,
  last_run_at TEXT,
  next_run_at TEXT NOT NULL,
  last_run_id INTEGER,
  last_run_status TEXT,
  run_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS runs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  project_id TEXT NOT NULL,
  benchmark_id INTEGER NOT NULL,
  benchmark_version TEXT NOT NULL,
  engines_json TEXT NOT NULL DEFAULT '[]',
  channels_json TEXT NOT NULL DEFAULT '[]',
  status TEXT NOT NULL,
  total_pairs INTEGER NOT NULL,
  completed_pairs INTEGER NOT NULL DEFAULT 0,
  failed_pairs INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL,
  visibility_rate REAL,
  avg_ranking REAL,
  danger_count INTEGER,
  total_results INTEGER
);

CREATE TABLE IF NOT EXISTS results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  run_id INTEGER NOT NULL REFERENCES runs(id),
  question_id INTEGER NOT NULL,
  engine TEXT NOT NULL,
  channel TEXT NOT NULL,
  outcome TEXT NOT NULL,
  response_text TEXT NOT NULL DEFAULT '',
  sentiment TEXT NOT NULL DEFAULT 'neutral',
  brand_mentioned INTEGER NOT NULL DEFAULT 0,
  competitor_mentioned INTEGER NOT NULL DEFAULT 0,
  competitors_json TEXT NOT NULL DEFAULT '[]',
  ranking INTEGER,
  sources_json TEXT NOT NULL DEFAULT '[]',
  risk_flags_json TEXT NOT NULL DEFAULT '[]',
  cta TEXT,
  visibility_score INTEGER NOT NULL DEFAULT 0,
  error TEXT,
  analysis_json TEXT,
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_benchmark ON questions(benchmark_id);
CREATE INDEX IF NOT EXISTS idx_versions_benchmark ON benchmark_versions(benchmark_id);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON scheduled_tasks(project_id);
CREATE INDEX IF NOT EXISTS idx_runs_project ON runs(project_id);
CREATE INDEX IF NOT EXISTS idx_results_run ON results(run_id);
"#;
