//! Shared module skeletons, identical for every environment

use crate::generate::graph::Module;

pub struct ModuleSource {
    pub main: &'static str,
    pub variables: &'static str,
    pub outputs: &'static str,
}

pub fn source(module: Module) -> ModuleSource {
    match module {
        Module::Network => ModuleSource {
            main: NETWORK_MAIN,
            variables: NETWORK_VARIABLES,
            outputs: NETWORK_OUTPUTS,
        },
        Module::Compute => ModuleSource {
            main: COMPUTE_MAIN,
            variables: COMPUTE_VARIABLES,
            outputs: COMPUTE_OUTPUTS,
        },
        Module::Storage => ModuleSource {
            main: STORAGE_MAIN,
            variables: STORAGE_VARIABLES,
            outputs: STORAGE_OUTPUTS,
        },
        Module::Database => ModuleSource {
            main: DATABASE_MAIN,
            variables: DATABASE_VARIABLES,
            outputs: DATABASE_OUTPUTS,
        },
        Module::Monitoring => ModuleSource {
            main: MONITORING_MAIN,
            variables: MONITORING_VARIABLES,
            outputs: MONITORING_OUTPUTS,
        },
    }
}

const NETWORK_MAIN: &str = r#"data "aws_availability_zones" "available" {
  state = "available"
}

locals {
  azs = slice(data.aws_availability_zones.available.names, 0, var.az_count)
}

resource "aws_vpc" "this" {
  cidr_block           = var.cidr_block
  enable_dns_hostnames = true
  enable_dns_support   = true

  tags = merge(var.tags, { Name = var.name })
}

resource "aws_internet_gateway" "this" {
  vpc_id = aws_vpc.this.id
  tags   = var.tags
}

resource "aws_subnet" "public" {
  count                   = var.az_count
  vpc_id                  = aws_vpc.this.id
  cidr_block              = cidrsubnet(var.cidr_block, 8, count.index)
  availability_zone       = local.azs[count.index]
  map_public_ip_on_launch = true

  tags = merge(var.tags, { Name = "${var.name}-public-${count.index}" })
}

resource "aws_subnet" "private" {
  count             = var.az_count
  vpc_id            = aws_vpc.this.id
  cidr_block        = cidrsubnet(var.cidr_block, 8, count.index + 100)
  availability_zone = local.azs[count.index]

  tags = merge(var.tags, { Name = "${var.name}-private-${count.index}" })
}

resource "aws_route_table" "public" {
  vpc_id = aws_vpc.this.id

  route {
    cidr_block = "0.0.0.0/0"
    gateway_id = aws_internet_gateway.this.id
  }

  tags = var.tags
}

resource "aws_route_table_association" "public" {
  count          = var.az_count
  subnet_id      = aws_subnet.public[count.index].id
  route_table_id = aws_route_table.public.id
}
"#;

const NETWORK_VARIABLES: &str = r#"variable "name" {
  type = string
}

variable "cidr_block" {
  type    = string
  default = "10.0.0.0/16"
}

variable "az_count" {
  type    = number
  default = 2
}

variable "tags" {
  type    = map(string)
  default = {}
}
"#;

const NETWORK_OUTPUTS: &str = r#"output "vpc_id" {
  value = aws_vpc.this.id
}

output "public_subnet_ids" {
  value = aws_subnet.public[*].id
}

output "private_subnet_ids" {
  value = aws_subnet.private[*].id
}
"#;

const COMPUTE_MAIN: &str = r#"resource "aws_ecs_cluster" "this" {
  name = var.name
  tags = var.tags
}

resource "aws_security_group" "service" {
  name_prefix = "${var.name}-svc-"
  vpc_id      = var.vpc_id

  ingress {
    from_port   = var.container_port
    to_port     = var.container_port
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }

  egress {
    from_port   = 0
    to_port     = 0
    protocol    = "-1"
    cidr_blocks = ["0.0.0.0/0"]
  }

  tags = var.tags
}

resource "aws_iam_role" "execution" {
  name_prefix = "${var.name}-exec-"
  assume_role_policy = jsonencode({
    Version = "2012-10-17"
    Statement = [{
      Effect    = "Allow"
      Action    = "sts:AssumeRole"
      Principal = { Service = "ecs-tasks.amazonaws.com" }
    }]
  })
  tags = var.tags
}

resource "aws_iam_role_policy_attachment" "execution" {
  role       = aws_iam_role.execution.name
  policy_arn = "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy"
}

resource "aws_ecs_task_definition" "this" {
  family                   = var.name
  requires_compatibilities = ["FARGATE"]
  network_mode             = "awsvpc"
  cpu                      = var.cpu
  memory                   = var.memory
  execution_role_arn       = aws_iam_role.execution.arn

  container_definitions = jsonencode([{
    name         = var.name
    image        = var.image
    essential    = true
    portMappings = [{ containerPort = var.container_port, protocol = "tcp" }]
  }])

  tags = var.tags
}

resource "aws_ecs_service" "this" {
  name            = var.name
  cluster         = aws_ecs_cluster.this.id
  task_definition = aws_ecs_task_definition.this.arn
  desired_count   = var.desired_count
  launch_type     = "FARGATE"

  network_configuration {
    subnets          = var.subnet_ids
    security_groups  = [aws_security_group.service.id]
    assign_public_ip = true
  }

  lifecycle {
    ignore_changes = [desired_count]
  }

  tags = var.tags
}

resource "aws_appautoscaling_target" "this" {
  count              = var.autoscaling_enabled ? 1 : 0
  service_namespace  = "ecs"
  scalable_dimension = "ecs:service:DesiredCount"
  resource_id        = "service/${aws_ecs_cluster.this.name}/${aws_ecs_service.this.name}"
  min_capacity       = var.desired_count
  max_capacity       = var.max_count
}

resource "aws_appautoscaling_policy" "cpu" {
  count              = var.autoscaling_enabled ? 1 : 0
  name               = "${var.name}-cpu"
  policy_type        = "TargetTrackingScaling"
  service_namespace  = aws_appautoscaling_target.this[0].service_namespace
  scalable_dimension = aws_appautoscaling_target.this[0].scalable_dimension
  resource_id        = aws_appautoscaling_target.this[0].resource_id

  target_tracking_scaling_policy_configuration {
    target_value = 70

    predefined_metric_specification {
      predefined_metric_type = "ECSServiceAverageCPUUtilization"
    }
  }
}
"#;

const COMPUTE_VARIABLES: &str = r#"variable "name" {
  type = string
}

variable "vpc_id" {
  type = string
}

variable "subnet_ids" {
  type = list(string)
}

variable "image" {
  type = string
}

variable "container_port" {
  type    = number
  default = 8080
}

variable "cpu" {
  type = number
}

variable "memory" {
  type = number
}

variable "desired_count" {
  type = number
}

variable "max_count" {
  type = number
}

variable "autoscaling_enabled" {
  type    = bool
  default = false
}

variable "tags" {
  type    = map(string)
  default = {}
}
"#;

const COMPUTE_OUTPUTS: &str = r#"output "cluster_name" {
  value = aws_ecs_cluster.this.name
}

output "service_name" {
  value = aws_ecs_service.this.name
}

output "security_group_id" {
  value = aws_security_group.service.id
}
"#;

const STORAGE_MAIN: &str = r#"resource "aws_s3_bucket" "this" {
  bucket_prefix = "${var.name}-"
  force_destroy = var.force_destroy
  tags          = var.tags
}

resource "aws_s3_bucket_versioning" "this" {
  bucket = aws_s3_bucket.this.id

  versioning_configuration {
    status = "Enabled"
  }
}

resource "aws_s3_bucket_public_access_block" "this" {
  bucket                  = aws_s3_bucket.this.id
  block_public_acls       = true
  block_public_policy     = true
  ignore_public_acls      = true
  restrict_public_buckets = true
}

resource "aws_s3_bucket_server_side_encryption_configuration" "this" {
  bucket = aws_s3_bucket.this.id

  rule {
    apply_server_side_encryption_by_default {
      sse_algorithm = "AES256"
    }
  }
}

resource "aws_s3_bucket_lifecycle_configuration" "this" {
  bucket = aws_s3_bucket.this.id

  rule {
    id     = "expire-noncurrent"
    status = "Enabled"

    filter {}

    noncurrent_version_expiration {
      noncurrent_days = var.retention_days
    }
  }
}
"#;

const STORAGE_VARIABLES: &str = r#"variable "name" {
  type = string
}

variable "retention_days" {
  type = number
}

variable "force_destroy" {
  type    = bool
  default = false
}

variable "tags" {
  type    = map(string)
  default = {}
}
"#;

const STORAGE_OUTPUTS: &str = r#"output "bucket_name" {
  value = aws_s3_bucket.this.bucket
}

output "bucket_arn" {
  value = aws_s3_bucket.this.arn
}
"#;

const DATABASE_MAIN: &str = r#"locals {
  port = var.engine == "mysql" ? 3306 : 5432
}

resource "aws_db_subnet_group" "this" {
  name_prefix = "${var.name}-"
  subnet_ids  = var.subnet_ids
  tags        = var.tags
}

resource "aws_security_group" "db" {
  name_prefix = "${var.name}-db-"
  vpc_id      = var.vpc_id

  ingress {
    from_port       = local.port
    to_port         = local.port
    protocol        = "tcp"
    security_groups = [var.app_security_group_id]
  }

  tags = var.tags
}

resource "aws_db_instance" "this" {
  identifier_prefix           = "${var.name}-"
  engine                      = var.engine
  instance_class              = var.instance_class
  allocated_storage           = var.allocated_storage
  db_name                     = var.db_name
  username                    = var.username
  manage_master_user_password = true
  port                        = local.port
  multi_az                    = var.multi_az
  backup_retention_period     = var.backup_retention_days
  storage_encrypted           = true
  db_subnet_group_name        = aws_db_subnet_group.this.name
  vpc_security_group_ids      = [aws_security_group.db.id]
  skip_final_snapshot         = !var.multi_az
  final_snapshot_identifier   = var.multi_az ? "${var.name}-final" : null
  tags                        = var.tags
}
"#;

const DATABASE_VARIABLES: &str = r#"variable "name" {
  type = string
}

variable "vpc_id" {
  type = string
}

variable "subnet_ids" {
  type = list(string)
}

variable "app_security_group_id" {
  type = string
}

variable "engine" {
  type    = string
  default = "postgres"
}

variable "instance_class" {
  type = string
}

variable "allocated_storage" {
  type = number
}

variable "db_name" {
  type    = string
  default = "app"
}

variable "username" {
  type    = string
  default = "app"
}

variable "multi_az" {
  type    = bool
  default = false
}

variable "backup_retention_days" {
  type = number
}

variable "tags" {
  type    = map(string)
  default = {}
}
"#;

const DATABASE_OUTPUTS: &str = r#"output "db_instance_id" {
  value = aws_db_instance.this.id
}

output "endpoint" {
  value = aws_db_instance.this.address
}

output "port" {
  value = aws_db_instance.this.port
}
"#;

const MONITORING_MAIN: &str = r#"resource "aws_sns_topic" "alarms" {
  name = "${var.name}-alarms"
  tags = var.tags
}

resource "aws_cloudwatch_log_group" "app" {
  name              = "/app/${var.name}"
  retention_in_days = var.retention_days
  tags              = var.tags
}

resource "aws_cloudwatch_metric_alarm" "service_cpu" {
  count               = var.service_alarm_enabled ? 1 : 0
  alarm_name          = "${var.name}-service-cpu-high"
  namespace           = "AWS/ECS"
  metric_name         = "CPUUtilization"
  statistic           = "Average"
  comparison_operator = "GreaterThanThreshold"
  threshold           = 80
  period              = 300
  evaluation_periods  = 2
  alarm_actions       = [aws_sns_topic.alarms.arn]

  dimensions = {
    ClusterName = var.cluster_name
    ServiceName = var.service_name
  }
}

resource "aws_cloudwatch_metric_alarm" "database_cpu" {
  count               = var.database_alarm_enabled ? 1 : 0
  alarm_name          = "${var.name}-database-cpu-high"
  namespace           = "AWS/RDS"
  metric_name         = "CPUUtilization"
  statistic           = "Average"
  comparison_operator = "GreaterThanThreshold"
  threshold           = 80
  period              = 300
  evaluation_periods  = 2
  alarm_actions       = [aws_sns_topic.alarms.arn]

  dimensions = {
    DBInstanceIdentifier = var.db_instance_id
  }
}
"#;

const MONITORING_VARIABLES: &str = r#"variable "name" {
  type = string
}

variable "retention_days" {
  type = number
}

variable "service_alarm_enabled" {
  type    = bool
  default = false
}

variable "cluster_name" {
  type    = string
  default = null
}

variable "service_name" {
  type    = string
  default = null
}

variable "database_alarm_enabled" {
  type    = bool
  default = false
}

variable "db_instance_id" {
  type    = string
  default = null
}

variable "bucket_name" {
  type    = string
  default = null
}

variable "tags" {
  type    = map(string)
  default = {}
}
"#;

const MONITORING_OUTPUTS: &str = r#"output "alarm_topic_arn" {
  value = aws_sns_topic.alarms.arn
}

output "log_group_name" {
  value = aws_cloudwatch_log_group.app.name
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_counts_are_plan_time_flags() {
        let main = source(Module::Monitoring).main;
        assert!(main.contains("count               = var.service_alarm_enabled ? 1 : 0"));
        assert!(main.contains("count               = var.database_alarm_enabled ? 1 : 0"));
        assert!(!main.contains("== null"));
    }

    #[test]
    fn test_database_keeps_a_final_snapshot_when_multi_az() {
        let main = source(Module::Database).main;
        assert!(main.contains("skip_final_snapshot         = !var.multi_az"));
        assert!(main.contains("final_snapshot_identifier   = var.multi_az ? \"${var.name}-final\" : null"));
    }

    #[test]
    fn test_every_declared_output_is_defined() {
        for module in Module::ALL {
            let outputs = source(module).outputs;
            for name in module.outputs() {
                assert!(
                    outputs.contains(&format!("output \"{}\"", name)),
                    "{} is missing output {}",
                    module,
                    name
                );
            }
        }
    }
}
