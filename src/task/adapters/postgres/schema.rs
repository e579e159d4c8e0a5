//! Diesel schema for the task engine tables.

diesel::table! {
    /// Task records.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning tenant.
        tenant_id -> Uuid,
        /// Property the work happens at.
        property_id -> Uuid,
        /// Originating reservation.
        reservation_id -> Nullable<Uuid>,
        /// Originating automation rule.
        auto_rule_id -> Nullable<Uuid>,
        /// Fusion pair the task belongs to.
        fusion_pair_id -> Nullable<Uuid>,
        /// Title.
        #[max_length = 255]
        title -> Varchar,
        /// Description.
        description -> Nullable<Text>,
        /// Category.
        #[max_length = 50]
        category -> Varchar,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Scheduled start.
        scheduled_at -> Nullable<Timestamptz>,
        /// Duration in minutes.
        duration_minutes -> Nullable<Int4>,
        /// Assigned staff member.
        assigned_to -> Nullable<Uuid>,
        /// Free-text note.
        note -> Nullable<Text>,
        /// Work start timestamp.
        started_at -> Nullable<Timestamptz>,
        /// Work completion timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Latest mutation timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only status transition history.
    task_history (id) {
        /// Entry identifier.
        id -> Uuid,
        /// Task the transition applied to.
        task_id -> Uuid,
        /// Status before the transition.
        #[max_length = 50]
        from_status -> Varchar,
        /// Status after the transition.
        #[max_length = 50]
        to_status -> Varchar,
        /// Applied action.
        #[max_length = 50]
        action -> Varchar,
        /// User who performed the transition.
        actor_id -> Uuid,
        /// User represented by a proxy transition.
        on_behalf_of -> Nullable<Uuid>,
        /// Whether the transition was performed by proxy.
        is_proxy -> Bool,
        /// Optional note.
        note -> Nullable<Text>,
        /// Recording timestamp.
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Scheduling conflicts keyed by canonical task pair.
    task_conflicts (id) {
        /// Conflict identifier.
        id -> Uuid,
        /// Owning tenant.
        tenant_id -> Uuid,
        /// Lower task identifier of the pair.
        task_a_id -> Uuid,
        /// Higher task identifier of the pair.
        task_b_id -> Uuid,
        /// Conflict kind.
        #[max_length = 50]
        kind -> Varchar,
        /// Conflict status.
        #[max_length = 50]
        status -> Varchar,
        /// Resolution note.
        resolution -> Nullable<Text>,
        /// Detection timestamp.
        detected_at -> Timestamptz,
        /// Acknowledgement timestamp.
        acknowledged_at -> Nullable<Timestamptz>,
        /// Resolution timestamp.
        resolved_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Merge proposals keyed by canonical task pair.
    fusion_pairs (id) {
        /// Fusion pair identifier.
        id -> Uuid,
        /// Owning tenant.
        tenant_id -> Uuid,
        /// Property shared by both tasks.
        property_id -> Uuid,
        /// Lower task identifier of the pair.
        task_a_id -> Uuid,
        /// Higher task identifier of the pair.
        task_b_id -> Uuid,
        /// Proposal status.
        #[max_length = 50]
        status -> Varchar,
        /// Task created by accepting the proposal.
        merged_task_id -> Nullable<Uuid>,
        /// Proposal timestamp.
        created_at -> Timestamptz,
        /// Resolution timestamp.
        resolved_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Pairs a user declined to merge.
    fusion_rejections (tenant_id, task_a_id, task_b_id) {
        /// Owning tenant.
        tenant_id -> Uuid,
        /// Lower task identifier of the pair.
        task_a_id -> Uuid,
        /// Higher task identifier of the pair.
        task_b_id -> Uuid,
        /// Rejection timestamp.
        rejected_at -> Timestamptz,
    }
}

diesel::table! {
    /// Audit rows written by the reservation cascade.
    reservation_task_audits (id) {
        /// Audit identifier.
        id -> Uuid,
        /// Owning tenant.
        tenant_id -> Uuid,
        /// Reservation that changed.
        reservation_id -> Uuid,
        /// Affected task.
        task_id -> Uuid,
        /// Cascade action.
        #[max_length = 50]
        action -> Varchar,
        /// Check-in before the change.
        previous_check_in -> Timestamptz,
        /// Check-out before the change.
        previous_check_out -> Timestamptz,
        /// Check-in after the change.
        current_check_in -> Nullable<Timestamptz>,
        /// Check-out after the change.
        current_check_out -> Nullable<Timestamptz>,
        /// Origin of the change.
        #[max_length = 50]
        source -> Varchar,
        /// Recording timestamp.
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Task automation rules, one per property and trigger.
    auto_rules (id) {
        /// Rule identifier.
        id -> Uuid,
        /// Owning tenant.
        tenant_id -> Uuid,
        /// Property the rule applies to.
        property_id -> Uuid,
        /// Reservation trigger.
        #[max_length = 50]
        trigger_type -> Varchar,
        /// Whether the rule fires.
        enabled -> Bool,
        /// Offset from the trigger anchor, in hours.
        offset_hours -> Int4,
        /// Title template.
        title_template -> Text,
    }
}

diesel::table! {
    /// Reservations persisted by the reservation subsystem.
    reservations (id) {
        /// Reservation identifier.
        id -> Uuid,
        /// Owning tenant.
        tenant_id -> Uuid,
    }
}
