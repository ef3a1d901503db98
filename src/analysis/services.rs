//! Data services evidenced by dependencies

use super::pattern::DependencyPattern;
use super::types::{DataService, Dependency, EvidenceSource, ServiceCategory};

#[derive(Debug, Clone, Copy)]
pub struct ServiceRule {
    pub pattern: DependencyPattern,
    pub service: &'static str,
    pub category: ServiceCategory,
}

const fn rule(
    pattern: DependencyPattern,
    service: &'static str,
    category: ServiceCategory,
) -> ServiceRule {
    ServiceRule {
        pattern,
        service,
        category,
    }
}

use DependencyPattern as P;
use ServiceCategory::{Cache, Database, Queue, Storage};

/// Dependency → canonical service. First matching rule wins for a dependency.
pub const SERVICE_RULES: &[ServiceRule] = &[
    // databases
    rule(P::exact("pg"), "postgresql", Database),
    rule(P::exact("pg-promise"), "postgresql", Database),
    rule(P::exact("postgres"), "postgresql", Database),
    rule(P::exact("psycopg2"), "postgresql", Database),
    rule(P::exact("psycopg2-binary"), "postgresql", Database),
    rule(P::exact("psycopg"), "postgresql", Database),
    rule(P::exact("asyncpg"), "postgresql", Database),
    rule(P::exact("sqlx"), "postgresql", Database),
    rule(P::exact("tokio-postgres"), "postgresql", Database),
    rule(P::exact("org.postgresql:postgresql"), "postgresql", Database),
    rule(P::prefix("github.com/lib/pq"), "postgresql", Database),
    rule(P::prefix("github.com/jackc/pgx"), "postgresql", Database),
    rule(P::exact("npgsql"), "postgresql", Database),
    rule(P::exact("mysql"), "mysql", Database),
    rule(P::exact("mysql2"), "mysql", Database),
    rule(P::exact("pymysql"), "mysql", Database),
    rule(P::exact("mysqlclient"), "mysql", Database),
    rule(P::exact("mysql_async"), "mysql", Database),
    rule(P::contains("mysql-connector"), "mysql", Database),
    rule(P::prefix("github.com/go-sql-driver/mysql"), "mysql", Database),
    rule(P::exact("mongodb"), "mongodb", Database),
    rule(P::exact("mongoose"), "mongodb", Database),
    rule(P::exact("pymongo"), "mongodb", Database),
    rule(P::exact("motor"), "mongodb", Database),
    rule(P::exact("mongoid"), "mongodb", Database),
    rule(P::prefix("org.mongodb:"), "mongodb", Database),
    rule(P::prefix("go.mongodb.org/mongo-driver"), "mongodb", Database),
    rule(P::exact("sqlite3"), "sqlite", Database),
    rule(P::exact("better-sqlite3"), "sqlite", Database),
    rule(P::exact("rusqlite"), "sqlite", Database),
    rule(P::exact("@aws-sdk/client-dynamodb"), "dynamodb", Database),
    rule(P::exact("dynamoose"), "dynamodb", Database),
    // caches
    rule(P::exact("redis"), "redis", Cache),
    rule(P::exact("ioredis"), "redis", Cache),
    rule(P::exact("aioredis"), "redis", Cache),
    rule(P::exact("redis-rb"), "redis", Cache),
    rule(P::prefix("github.com/redis/go-redis"), "redis", Cache),
    rule(P::prefix("github.com/go-redis/redis"), "redis", Cache),
    rule(P::contains("spring-boot-starter-data-redis"), "redis", Cache),
    rule(P::contains(":jedis"), "redis", Cache),
    rule(P::exact("stackexchange.redis"), "redis", Cache),
    rule(P::exact("memcached"), "memcached", Cache),
    rule(P::exact("memjs"), "memcached", Cache),
    rule(P::exact("pymemcache"), "memcached", Cache),
    rule(P::exact("dalli"), "memcached", Cache),
    // queues
    rule(P::exact("amqplib"), "rabbitmq", Queue),
    rule(P::exact("amqp-connection-manager"), "rabbitmq", Queue),
    rule(P::exact("pika"), "rabbitmq", Queue),
    rule(P::exact("aio-pika"), "rabbitmq", Queue),
    rule(P::exact("bunny"), "rabbitmq", Queue),
    rule(P::exact("lapin"), "rabbitmq", Queue),
    rule(P::prefix("github.com/rabbitmq/amqp091-go"), "rabbitmq", Queue),
    rule(P::contains("spring-boot-starter-amqp"), "rabbitmq", Queue),
    rule(P::exact("kafkajs"), "kafka", Queue),
    rule(P::exact("kafka-python"), "kafka", Queue),
    rule(P::exact("confluent-kafka"), "kafka", Queue),
    rule(P::exact("rdkafka"), "kafka", Queue),
    rule(P::prefix("org.apache.kafka:"), "kafka", Queue),
    rule(P::prefix("github.com/segmentio/kafka-go"), "kafka", Queue),
    rule(P::exact("@aws-sdk/client-sqs"), "sqs", Queue),
    rule(P::exact("sqs-consumer"), "sqs", Queue),
    rule(P::exact("nats"), "nats", Queue),
    rule(P::exact("async-nats"), "nats", Queue),
    rule(P::exact("bullmq"), "bullmq", Queue),
    rule(P::exact("bull"), "bullmq", Queue),
    // object storage
    rule(P::exact("@aws-sdk/client-s3"), "s3", Storage),
    rule(P::exact("multer-s3"), "s3", Storage),
    rule(P::exact("boto3"), "s3", Storage),
    rule(P::exact("aws-sdk-s3"), "s3", Storage),
    rule(P::prefix("github.com/aws/aws-sdk-go-v2/service/s3"), "s3", Storage),
    rule(P::exact("@google-cloud/storage"), "gcs", Storage),
    rule(P::exact("google-cloud-storage"), "gcs", Storage),
    rule(P::exact("@azure/storage-blob"), "azure-blob", Storage),
    rule(P::exact("azure-storage-blob"), "azure-blob", Storage),
    rule(P::exact("minio"), "minio", Storage),
];

/// Canonical service for a dependency name, if any rule matches
pub fn classify(name: &str) -> Option<&'static ServiceRule> {
    SERVICE_RULES.iter().find(|r| r.pattern.matches(name))
}

/// Services from dependencies, de-duplicated by canonical service with the first evidence kept
pub fn detect_services(dependencies: &[Dependency]) -> Vec<DataService> {
    let mut services: Vec<DataService> = Vec::new();
    for dep in dependencies.iter().filter(|d| !d.dev) {
        let Some(rule) = classify(&dep.name) else {
            continue;
        };
        if services.iter().any(|s| s.service() == rule.service) {
            continue;
        }
        if let Some(svc) = DataService::new(
            rule.category,
            rule.service,
            EvidenceSource::Dependency(dep.name.clone()),
        ) {
            services.push(svc);
        }
    }
    services
}

/// Adds env-derived services that the dependency scan did not already cover.
///
/// A generic entry (category known, service unknown) is dropped when the category
/// already holds a service.
pub fn merge_services(mut primary: Vec<DataService>, secondary: Vec<DataService>) -> Vec<DataService> {
    for svc in secondary {
        let duplicate = primary.iter().any(|s| s.service() == svc.service())
            || (svc.is_generic() && primary.iter().any(|s| s.category() == svc.category()));
        if !duplicate {
            primary.push(svc);
        }
    }
    primary
}
